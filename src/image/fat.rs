/*!
# FAT12/16 Image Writer

A bounded FAT12/16 implementation of [`super::ImageWriter`]. It parses the
BIOS Parameter Block, walks the root directory and one level of
subdirectory entries to resolve an absolute in-image path such as
`/EVE/A001.CC`, and rewrites the matched file's cluster chain in place.

Supported: same-size and shrinking replacement (written in place, trailing
clusters freed), and growth (new clusters allocated from the FAT and
linked onto the existing chain). Not supported: renaming, creating new
directory entries, or FAT32 — this is the minimal driver that makes
`import-to-image` runnable end-to-end, not a general-purpose filesystem.
*/

use std::path::{Path, PathBuf};

use crate::error::ImageError;

use super::ImageWriter;

const DIR_ENTRY_LEN: usize = 32;
const ATTR_DIRECTORY: u8 = 0x10;
const ATTR_LONG_NAME: u8 = 0x0F;
const ENTRY_FREE: u8 = 0xE5;
const ENTRY_END: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FatType {
    Fat12,
    Fat16,
}

/// A resolved directory entry: its parsed fields plus the absolute byte
/// offset of the 32-byte entry in the image, so it can be rewritten.
#[derive(Debug, Clone)]
struct DirEntry {
    entry_offset: usize,
    is_directory: bool,
    first_cluster: u16,
}

pub struct FatImage {
    path: PathBuf,
    data: Vec<u8>,
    bytes_per_sector: u32,
    sectors_per_cluster: u32,
    reserved_sectors: u32,
    num_fats: u32,
    root_entries: u32,
    sectors_per_fat: u32,
    fat_type: FatType,
}

impl FatImage {
    fn bpb_u16(data: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([data[offset], data[offset + 1]])
    }

    fn bpb_u32(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ])
    }

    fn fat_start(&self) -> usize {
        self.reserved_sectors as usize * self.bytes_per_sector as usize
    }

    fn root_dir_start(&self) -> usize {
        self.fat_start()
            + self.num_fats as usize * self.sectors_per_fat as usize * self.bytes_per_sector as usize
    }

    fn root_dir_len(&self) -> usize {
        self.root_entries as usize * DIR_ENTRY_LEN
    }

    fn data_start(&self) -> usize {
        self.root_dir_start() + self.root_dir_len()
    }

    fn cluster_size(&self) -> usize {
        self.sectors_per_cluster as usize * self.bytes_per_sector as usize
    }

    /// Number of usable data clusters. Valid cluster numbers run from 2
    /// to `cluster_count() + 1` inclusive (cluster numbering starts at 2).
    fn cluster_count(&self) -> u32 {
        let data_bytes = self.data.len().saturating_sub(self.data_start());
        (data_bytes / self.cluster_size()) as u32
    }

    fn cluster_offset(&self, cluster: u16) -> usize {
        self.data_start() + (cluster as usize - 2) * self.cluster_size()
    }

    fn is_end_of_chain(&self, value: u32) -> bool {
        match self.fat_type {
            FatType::Fat12 => value >= 0xFF8,
            FatType::Fat16 => value >= 0xFFF8,
        }
    }

    fn fat_get(&self, cluster: u16) -> u32 {
        let base = self.fat_start();
        match self.fat_type {
            FatType::Fat12 => {
                let offset = base + cluster as usize * 3 / 2;
                let word = Self::bpb_u16(&self.data, offset) as u32;
                if cluster % 2 == 0 {
                    word & 0x0FFF
                } else {
                    word >> 4
                }
            }
            FatType::Fat16 => {
                let offset = base + cluster as usize * 2;
                Self::bpb_u16(&self.data, offset) as u32
            }
        }
    }

    fn fat_set(&mut self, cluster: u16, value: u32) {
        for copy in 0..self.num_fats {
            let copy_base =
                self.fat_start() + copy as usize * self.sectors_per_fat as usize * self.bytes_per_sector as usize;
            match self.fat_type {
                FatType::Fat12 => {
                    let offset = copy_base + cluster as usize * 3 / 2;
                    let existing = Self::bpb_u16(&self.data, offset);
                    let packed = if cluster % 2 == 0 {
                        (existing & 0xF000) | (value as u16 & 0x0FFF)
                    } else {
                        (existing & 0x000F) | ((value as u16 & 0x0FFF) << 4)
                    };
                    self.data[offset..offset + 2].copy_from_slice(&packed.to_le_bytes());
                }
                FatType::Fat16 => {
                    let offset = copy_base + cluster as usize * 2;
                    self.data[offset..offset + 2].copy_from_slice(&(value as u16).to_le_bytes());
                }
            }
        }
    }

    fn chain(&self, first_cluster: u16) -> Vec<u16> {
        let mut clusters = Vec::new();
        let mut current = first_cluster;
        while current >= 2 && !self.is_end_of_chain(self.fat_get(current)) {
            clusters.push(current);
            current = self.fat_get(current) as u16;
        }
        if current >= 2 {
            clusters.push(current);
        }
        clusters
    }

    fn free_clusters(&self, count: usize) -> Result<Vec<u16>, ImageError> {
        let mut found = Vec::new();
        let max_cluster = self.cluster_count() as u16 + 1;
        for candidate in 2..=max_cluster {
            if self.fat_get(candidate) == 0 {
                found.push(candidate);
                if found.len() == count {
                    return Ok(found);
                }
            }
        }
        Err(ImageError::NoSpace {
            needed: count as u32,
            available: found.len() as u32,
        })
    }

    fn parse_dir_entries(region: &[u8], base_offset: usize) -> Vec<DirEntry> {
        let mut entries = Vec::new();
        for chunk_start in (0..region.len()).step_by(DIR_ENTRY_LEN) {
            let chunk = &region[chunk_start..chunk_start + DIR_ENTRY_LEN];
            if chunk[0] == ENTRY_END {
                break;
            }
            if chunk[0] == ENTRY_FREE || chunk[11] == ATTR_LONG_NAME {
                continue;
            }
            let first_cluster = u16::from_le_bytes([chunk[26], chunk[27]]);
            entries.push(DirEntry {
                entry_offset: base_offset + chunk_start,
                is_directory: chunk[11] & ATTR_DIRECTORY != 0,
                first_cluster,
            });
        }
        entries
    }

    fn raw_name(&self, entry_offset: usize) -> [u8; 11] {
        let mut name = [0u8; 11];
        name.copy_from_slice(&self.data[entry_offset..entry_offset + 11]);
        name
    }

    fn root_dir_entries(&self) -> Vec<DirEntry> {
        let start = self.root_dir_start();
        let region = &self.data[start..start + self.root_dir_len()];
        Self::parse_dir_entries(region, start)
    }

    fn subdir_entries(&self, first_cluster: u16) -> Vec<DirEntry> {
        let mut entries = Vec::new();
        for cluster in self.chain(first_cluster) {
            let offset = self.cluster_offset(cluster);
            let region = &self.data[offset..offset + self.cluster_size()];
            entries.extend(Self::parse_dir_entries(region, offset));
        }
        entries
    }

    /// Format a candidate path component into the padded 8.3 name FAT
    /// directory entries store, e.g. `"A001.CC"` -> `b"A001    CC "`.
    fn to_83_name(component: &str) -> [u8; 11] {
        let mut name = [b' '; 11];
        let upper = component.to_ascii_uppercase();
        let (base, ext) = upper.split_once('.').unwrap_or((upper.as_str(), ""));
        for (i, b) in base.bytes().take(8).enumerate() {
            name[i] = b;
        }
        for (i, b) in ext.bytes().take(3).enumerate() {
            name[8 + i] = b;
        }
        name
    }

    fn resolve(&self, path: &str) -> Result<DirEntry, ImageError> {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if components.is_empty() {
            return Err(ImageError::NotFound {
                path: path.to_string(),
            });
        }

        let mut current = self.root_dir_entries();
        for (i, component) in components.iter().enumerate() {
            let target_name = Self::to_83_name(component);
            let is_last = i == components.len() - 1;

            let found = current
                .iter()
                .find(|entry| self.raw_name(entry.entry_offset) == target_name)
                .cloned();

            match found {
                Some(entry) if is_last && !entry.is_directory => return Ok(entry),
                Some(entry) if !is_last && entry.is_directory => {
                    current = self.subdir_entries(entry.first_cluster);
                }
                _ => {
                    return Err(ImageError::NotFound {
                        path: path.to_string(),
                    })
                }
            }
        }

        Err(ImageError::NotFound {
            path: path.to_string(),
        })
    }

    fn write_cluster_data(&mut self, cluster: u16, chunk: &[u8]) {
        let offset = self.cluster_offset(cluster);
        let size = self.cluster_size();
        self.data[offset..offset + chunk.len()].copy_from_slice(chunk);
        for b in &mut self.data[offset + chunk.len()..offset + size] {
            *b = 0;
        }
    }
}

impl ImageWriter for FatImage {
    fn open(image_path: &Path) -> Result<Self, ImageError> {
        let data = std::fs::read(image_path)?;
        if data.len() < 512 {
            return Err(ImageError::ImageCorrupt {
                reason: "image smaller than one sector".to_string(),
            });
        }

        let bytes_per_sector = Self::bpb_u16(&data, 11) as u32;
        let sectors_per_cluster = data[13] as u32;
        let reserved_sectors = Self::bpb_u16(&data, 14) as u32;
        let num_fats = data[16] as u32;
        let root_entries = Self::bpb_u16(&data, 17) as u32;
        let sectors_per_fat = Self::bpb_u16(&data, 22) as u32;
        let total_sectors16 = Self::bpb_u16(&data, 19) as u32;
        let total_sectors32 = Self::bpb_u32(&data, 32);
        let total_sectors = if total_sectors16 != 0 {
            total_sectors16
        } else {
            total_sectors32
        };

        if bytes_per_sector == 0 || sectors_per_cluster == 0 || sectors_per_fat == 0 {
            return Err(ImageError::ImageCorrupt {
                reason: "BIOS parameter block has a zero field".to_string(),
            });
        }

        let root_dir_sectors =
            ((root_entries * 32) + bytes_per_sector - 1) / bytes_per_sector;
        let data_sectors = total_sectors
            .saturating_sub(reserved_sectors + num_fats * sectors_per_fat + root_dir_sectors);
        let cluster_count = data_sectors / sectors_per_cluster;
        let fat_type = if cluster_count < 4085 {
            FatType::Fat12
        } else {
            FatType::Fat16
        };

        Ok(Self {
            path: image_path.to_path_buf(),
            data,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            root_entries,
            sectors_per_fat,
            fat_type,
        })
    }

    fn replace_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ImageError> {
        let entry = self.resolve(path)?;
        let cluster_size = self.cluster_size();
        let existing_chain = if entry.first_cluster >= 2 {
            self.chain(entry.first_cluster)
        } else {
            Vec::new()
        };
        let needed = bytes.len().div_ceil(cluster_size);

        let mut new_first_cluster = entry.first_cluster;

        if needed <= existing_chain.len() {
            for (i, &cluster) in existing_chain.iter().enumerate() {
                if i < needed {
                    let start = i * cluster_size;
                    let end = ((i + 1) * cluster_size).min(bytes.len());
                    self.write_cluster_data(cluster, &bytes[start..end]);
                } else {
                    self.fat_set(cluster, 0);
                }
            }
            if needed == 0 {
                new_first_cluster = 0;
            } else if needed < existing_chain.len() {
                let eoc = match self.fat_type {
                    FatType::Fat12 => 0xFFF,
                    FatType::Fat16 => 0xFFFF,
                };
                self.fat_set(existing_chain[needed - 1], eoc);
            }
        } else {
            for (i, &cluster) in existing_chain.iter().enumerate() {
                let start = i * cluster_size;
                let end = ((i + 1) * cluster_size).min(bytes.len());
                self.write_cluster_data(cluster, &bytes[start..end]);
            }

            let additional = needed - existing_chain.len();
            let fresh = self.free_clusters(additional)?;
            let eoc = match self.fat_type {
                FatType::Fat12 => 0xFFF,
                FatType::Fat16 => 0xFFFF,
            };

            let mut full_chain = existing_chain.clone();
            full_chain.extend_from_slice(&fresh);

            if let Some(&last_existing) = existing_chain.last() {
                self.fat_set(last_existing, fresh[0] as u32);
            } else {
                new_first_cluster = fresh[0];
            }

            for (i, &cluster) in fresh.iter().enumerate() {
                let next = if i + 1 < fresh.len() {
                    fresh[i + 1] as u32
                } else {
                    eoc
                };
                self.fat_set(cluster, next);

                let global_index = existing_chain.len() + i;
                let start = global_index * cluster_size;
                let end = ((global_index + 1) * cluster_size).min(bytes.len());
                self.write_cluster_data(cluster, &bytes[start..end]);
            }
        }

        self.data[entry.entry_offset + 26..entry.entry_offset + 28]
            .copy_from_slice(&new_first_cluster.to_le_bytes());
        self.data[entry.entry_offset + 28..entry.entry_offset + 32]
            .copy_from_slice(&(bytes.len() as u32).to_le_bytes());

        Ok(())
    }

    fn close(self) -> Result<(), ImageError> {
        std::fs::write(&self.path, &self.data)?;
        Ok(())
    }
}
