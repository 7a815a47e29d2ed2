use std::path::{Path, PathBuf};

#[cfg(windows)]
use windows_sys::Win32::Storage::FileSystem::BY_HANDLE_FILE_INFORMATION;

use crate::{GameType, game::GameCache, plugin::has_ascii_extension};

const BSA_FILE_EXTENSION: &str = "bsa";

pub fn find_associated_archives(
    game_type: GameType,
    game_cache: &GameCache,
    plugin_path: &Path,
) -> Vec<PathBuf> {
    match game_type {
        // Skyrim (non-SE) plugins can only load BSAs that have exactly the
        // same basename, ignoring file extensions.
        GameType::Skyrim => find_associated_archive(plugin_path),

        // Skyrim SE can load BSAs that have exactly the same basename,
        // ignoring file extensions, and also BSAs with filenames of the form
        // "<basename> - Textures.bsa" (case-insensitively).
        GameType::SkyrimSE => {
            find_associated_archives_with_suffixes(plugin_path, BSA_FILE_EXTENSION, &["", " - Textures"])
        }

        // Oblivion .esp files can load archives which begin with the plugin
        // basename; .esm files cannot.
        GameType::Oblivion => {
            if has_ascii_extension(plugin_path, "esp") {
                find_associated_archives_with_arbitrary_suffixes(plugin_path, game_cache)
            } else {
                Vec::new()
            }
        }

        // FO3, FNV and FO4 plugins can load archives which begin with the
        // plugin basename.
        GameType::Fallout3 | GameType::FalloutNV | GameType::Fallout4 => {
            find_associated_archives_with_arbitrary_suffixes(plugin_path, game_cache)
        }
    }
}

fn find_associated_archive(plugin_path: &Path) -> Vec<PathBuf> {
    let archive_path = plugin_path.with_extension(BSA_FILE_EXTENSION);

    if archive_path.exists() {
        vec![archive_path]
    } else {
        Vec::new()
    }
}

fn find_associated_archives_with_suffixes(
    plugin_path: &Path,
    archive_extension: &str,
    supported_suffixes: &[&str],
) -> Vec<PathBuf> {
    let Some(file_stem) = plugin_path.file_stem() else {
        return Vec::new();
    };

    supported_suffixes
        .iter()
        .map(|suffix| {
            let mut filename = file_stem.to_os_string();
            filename.push(suffix);
            filename.push(".");
            filename.push(archive_extension);

            plugin_path.with_file_name(filename)
        })
        .filter(|p| p.exists())
        .collect()
}

fn find_associated_archives_with_arbitrary_suffixes(
    plugin_path: &Path,
    game_cache: &GameCache,
) -> Vec<PathBuf> {
    let plugin_stem_len = match plugin_path.file_stem().and_then(|s| s.to_str()) {
        Some(s) => s.len(),
        None => return Vec::new(),
    };
    let Some(plugin_extension) = plugin_path.extension() else {
        return Vec::new();
    };

    game_cache
        .archives_iter()
        .filter(|path| {
            // Need to check if it starts with the given plugin's basename,
            // case-insensitively. This is hard to do accurately, so instead
            // check if an archive with the same length basename and the
            // given plugin's file extension is equivalent to it.
            let Some(archive_filename) = path.file_name().and_then(|s| s.to_str()) else {
                return false;
            };

            // Can't just slice the archive filename to the plugin file
            // stem's length directly because that might not slice on a
            // character boundary, so truncate the byte slice and then check
            // it's still valid UTF-8.
            if archive_filename.len() < plugin_stem_len {
                return false;
            }

            let Some(filename) = archive_filename.get(..plugin_stem_len) else {
                return false;
            };

            let archive_plugin_path = plugin_path
                .with_file_name(filename)
                .with_extension(plugin_extension);

            are_file_paths_equivalent(&archive_plugin_path, plugin_path)
        })
        .cloned()
        .collect()
}

#[cfg(windows)]
fn are_file_paths_equivalent(lhs: &Path, rhs: &Path) -> bool {
    use std::fs::File;

    if lhs == rhs {
        return true;
    }

    let Ok(lhs_file) = File::open(lhs) else {
        return false;
    };

    let Ok(rhs_file) = File::open(rhs) else {
        return false;
    };

    let Some(lhs_info) = get_file_info(&lhs_file) else {
        return false;
    };

    let Some(rhs_info) = get_file_info(&rhs_file) else {
        return false;
    };

    lhs_info.dwVolumeSerialNumber == rhs_info.dwVolumeSerialNumber
        && lhs_info.nFileIndexHigh == rhs_info.nFileIndexHigh
        && lhs_info.nFileIndexLow == rhs_info.nFileIndexLow
}

#[cfg(windows)]
fn get_file_info(file: &std::fs::File) -> Option<BY_HANDLE_FILE_INFORMATION> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Storage::FileSystem::GetFileInformationByHandle;

    let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { std::mem::zeroed() };

    // SAFETY: the file handle is valid for the lifetime of `file`, and
    // `info` is a valid, appropriately-sized out parameter.
    #[expect(
        unsafe_code,
        reason = "There is currently no way to get this data safely"
    )]
    let ok = unsafe { GetFileInformationByHandle(file.as_raw_handle() as _, &mut info) };

    (ok != 0).then_some(info)
}

#[cfg(not(windows))]
fn are_file_paths_equivalent(lhs: &Path, rhs: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    if lhs == rhs {
        return true;
    }

    let Ok(lhs_metadata) = lhs.metadata() else {
        return false;
    };

    let Ok(rhs_metadata) = rhs.metadata() else {
        return false;
    };

    lhs_metadata.dev() == rhs_metadata.dev() && lhs_metadata.ino() == rhs_metadata.ino()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn are_file_paths_equivalent_should_be_true_if_given_equal_paths_that_do_not_exist() {
        let file_path = Path::new("missing");

        assert!(!file_path.exists());
        assert!(are_file_paths_equivalent(file_path, file_path));
    }

    #[test]
    fn are_file_paths_equivalent_should_be_false_if_given_case_insensitively_equal_paths_that_do_not_exist()
     {
        let file_path1 = Path::new("missing");
        let file_path2 = Path::new("MISSING");

        assert!(!file_path1.exists());
        assert!(!file_path2.exists());
        assert!(!are_file_paths_equivalent(file_path1, file_path2));
    }

    #[test]
    fn find_associated_archive_should_return_empty_vec_if_no_archive_exists() {
        let path = Path::new("/does/not/exist/plugin.esm");
        assert!(find_associated_archive(path).is_empty());
    }
}
