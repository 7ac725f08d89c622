use crate::error::{CleanerError, CleanerResult};
use crate::platform::{
    AppliedPatch, CacheFileSystem, CacheLocator, Enumerated, InstallerRegistry, ListedFile,
    PatchCode, ProductCode, PropertyRead,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const INSTALLER_SUBDIR: &str = "Installer";

#[cfg(all(target_os = "windows", feature = "windows-native"))]
mod win {
    use super::*;
    use std::iter::once;
    use windows::core::{w, PCWSTR, PWSTR};
    use windows::Win32::Foundation::{
        ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS,
    };
    use windows::Win32::Storage::FileSystem::{
        FindClose, FindFirstFileW, FindNextFileW, FILE_ATTRIBUTE_DIRECTORY, WIN32_FIND_DATAW,
    };
    use windows::Win32::System::ApplicationInstallationAndServicing::{
        MsiEnumPatchesW, MsiEnumProductsW, MsiGetPatchInfoW, MsiGetProductInfoW,
    };
    use windows::Win32::System::Com::CoTaskMemFree;
    use windows::Win32::UI::Shell::{FOLDERID_Windows, SHGetKnownFolderPath, KF_FLAG_DEFAULT};

    const GUID_CHARS: usize = 39;
    const TRANSFORMS_CHARS: usize = 128;

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(once(0)).collect()
    }

    fn from_wide(buf: &[u16]) -> String {
        let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        String::from_utf16_lossy(&buf[..len])
    }

    fn enumerated<T>(code: u32, item: impl FnOnce() -> T) -> Enumerated<T> {
        if code == ERROR_SUCCESS.0 {
            Enumerated::Item(item())
        } else if code == ERROR_NO_MORE_ITEMS.0 {
            Enumerated::NoMoreItems
        } else {
            Enumerated::Failed(code)
        }
    }

    pub fn windows_dir() -> CleanerResult<PathBuf> {
        unsafe {
            let raw = SHGetKnownFolderPath(&FOLDERID_Windows, KF_FLAG_DEFAULT, None).map_err(
                |e| CleanerError::LocationUnavailable(format!("SHGetKnownFolderPath failed: {e}")),
            )?;
            let path = raw.to_string();
            CoTaskMemFree(Some(raw.0 as *const _));
            let path = path.map_err(|e| CleanerError::LocationUnavailable(e.to_string()))?;
            Ok(PathBuf::from(path))
        }
    }

    pub fn find_files(dir: &Path, pattern: &str) -> io::Result<Vec<ListedFile>> {
        let query = wide(&dir.join(pattern).to_string_lossy());
        let mut data = WIN32_FIND_DATAW::default();
        let mut files = Vec::new();
        unsafe {
            let handle = match FindFirstFileW(PCWSTR(query.as_ptr()), &mut data) {
                Ok(handle) => handle,
                Err(e) if e.code() == ERROR_FILE_NOT_FOUND.to_hresult() => return Ok(files),
                Err(e) => return Err(io::Error::from_raw_os_error(e.code().0 & 0xFFFF)),
            };
            loop {
                if data.dwFileAttributes & FILE_ATTRIBUTE_DIRECTORY.0 == 0 {
                    let size = ((data.nFileSizeHigh as u64) << 32) | data.nFileSizeLow as u64;
                    files.push(ListedFile {
                        name: from_wide(&data.cFileName),
                        size,
                    });
                }
                if FindNextFileW(handle, &mut data).is_err() {
                    break;
                }
            }
            let _ = FindClose(handle);
        }
        Ok(files)
    }

    pub fn product_at(index: u32) -> Enumerated<ProductCode> {
        let mut buf = [0u16; GUID_CHARS];
        let code = unsafe { MsiEnumProductsW(index, &mut buf) };
        enumerated(code, || ProductCode(from_wide(&buf)))
    }

    pub fn patch_at(product: &ProductCode, index: u32) -> Enumerated<AppliedPatch> {
        let product_w = wide(&product.0);
        let mut patch = [0u16; GUID_CHARS];
        let mut transforms = vec![0u16; TRANSFORMS_CHARS];
        let mut code = ERROR_MORE_DATA.0;
        for _ in 0..2 {
            let mut len = transforms.len() as u32;
            code = unsafe {
                MsiEnumPatchesW(
                    PCWSTR(product_w.as_ptr()),
                    index,
                    PWSTR(patch.as_mut_ptr()),
                    PWSTR(transforms.as_mut_ptr()),
                    &mut len,
                )
            };
            if code != ERROR_MORE_DATA.0 {
                break;
            }
            transforms = vec![0u16; len as usize + 1];
        }
        enumerated(code, || AppliedPatch {
            code: PatchCode(from_wide(&patch)),
            transforms: from_wide(&transforms),
        })
    }

    fn read_into(capacity: usize, call: impl FnOnce(PWSTR, *mut u32) -> u32) -> PropertyRead {
        let mut buf = vec![0u16; capacity + 1];
        let mut len = buf.len() as u32;
        let code = call(PWSTR(buf.as_mut_ptr()), &mut len);
        if code == ERROR_SUCCESS.0 {
            let len = (len as usize).min(capacity);
            PropertyRead::Value(String::from_utf16_lossy(&buf[..len]))
        } else if code == ERROR_MORE_DATA.0 {
            PropertyRead::BufferTooSmall {
                required: len as usize,
            }
        } else {
            PropertyRead::Unavailable(code)
        }
    }

    pub fn product_local_package(product: &ProductCode, capacity: usize) -> PropertyRead {
        let product_w = wide(&product.0);
        read_into(capacity, |buf, len| unsafe {
            MsiGetProductInfoW(PCWSTR(product_w.as_ptr()), w!("LocalPackage"), buf, Some(len))
        })
    }

    pub fn patch_local_package(patch: &PatchCode, capacity: usize) -> PropertyRead {
        let patch_w = wide(&patch.0);
        read_into(capacity, |buf, len| unsafe {
            MsiGetPatchInfoW(PCWSTR(patch_w.as_ptr()), w!("LocalPackage"), buf, Some(len))
        })
    }

}

/// `<Windows folder>\Installer`, resolved through the known-folder API.
#[derive(Debug, Default, Clone, Copy)]
pub struct KnownFolderLocator;

impl CacheLocator for KnownFolderLocator {
    #[cfg(all(target_os = "windows", feature = "windows-native"))]
    fn cache_dir(&self) -> CleanerResult<PathBuf> {
        Ok(win::windows_dir()?.join(INSTALLER_SUBDIR))
    }

    #[cfg(not(all(target_os = "windows", feature = "windows-native")))]
    fn cache_dir(&self) -> CleanerResult<PathBuf> {
        Err(CleanerError::LocationUnavailable(format!(
            "no known-folder resolver for the {INSTALLER_SUBDIR} directory on this build"
        )))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFileSystem;

impl CacheFileSystem for NativeFileSystem {
    #[cfg(all(target_os = "windows", feature = "windows-native"))]
    fn list(&self, dir: &Path, pattern: &str) -> io::Result<Vec<ListedFile>> {
        win::find_files(dir, pattern)
    }

    #[cfg(not(all(target_os = "windows", feature = "windows-native")))]
    fn list(&self, dir: &Path, pattern: &str) -> io::Result<Vec<ListedFile>> {
        list_matching(dir, pattern)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Portable listing: one directory level, regular files only.
pub fn list_matching(dir: &Path, pattern: &str) -> io::Result<Vec<ListedFile>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !matches_pattern(pattern, &name) {
            continue;
        }
        let size = entry.metadata()?.len();
        files.push(ListedFile { name, size });
    }
    Ok(files)
}

/// Case-insensitive wildcard match supporting `*` and `?`.
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.to_lowercase().chars().collect();
    let n: Vec<char> = name.to_lowercase().chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// The Windows Installer product and patch registry.
#[derive(Debug, Clone, Copy)]
pub struct MsiRegistry {
    _private: (),
}

impl MsiRegistry {
    #[cfg(all(target_os = "windows", feature = "windows-native"))]
    pub fn new() -> CleanerResult<Self> {
        Ok(Self { _private: () })
    }

    #[cfg(not(all(target_os = "windows", feature = "windows-native")))]
    pub fn new() -> CleanerResult<Self> {
        Err(CleanerError::UnsupportedPlatform)
    }
}

#[cfg(all(target_os = "windows", feature = "windows-native"))]
impl InstallerRegistry for MsiRegistry {
    fn product_at(&self, index: u32) -> Enumerated<ProductCode> {
        win::product_at(index)
    }

    fn patch_at(&self, product: &ProductCode, index: u32) -> Enumerated<AppliedPatch> {
        win::patch_at(product, index)
    }

    fn product_local_package(&self, product: &ProductCode, capacity: usize) -> PropertyRead {
        win::product_local_package(product, capacity)
    }

    fn patch_local_package(&self, patch: &PatchCode, capacity: usize) -> PropertyRead {
        win::patch_local_package(patch, capacity)
    }
}

// Not constructible here; `MsiRegistry::new` reports `UnsupportedPlatform`.
#[cfg(not(all(target_os = "windows", feature = "windows-native")))]
impl InstallerRegistry for MsiRegistry {
    fn product_at(&self, _index: u32) -> Enumerated<ProductCode> {
        Enumerated::NoMoreItems
    }

    fn patch_at(&self, _product: &ProductCode, _index: u32) -> Enumerated<AppliedPatch> {
        Enumerated::NoMoreItems
    }

    fn product_local_package(&self, _product: &ProductCode, _capacity: usize) -> PropertyRead {
        PropertyRead::Unavailable(0)
    }

    fn patch_local_package(&self, _patch: &PatchCode, _capacity: usize) -> PropertyRead {
        PropertyRead::Unavailable(0)
    }
}
