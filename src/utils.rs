//! Filesystem and naming helpers

use std::path::Path;

/// Longest file name stem offered to clients
const MAX_FILENAME_LEN: usize = 80;

/// Stem used when a title has no usable characters
const FALLBACK_FILENAME: &str = "video";

/// Turn a video title into a download file name stem
///
/// Keeps ASCII letters, digits, `-` and `_`; runs of anything else collapse
/// into a single space. The result is safe inside a quoted
/// `Content-Disposition` value.
///
/// # Examples
///
/// ```
/// use ytdlp_gateway::utils::safe_filename;
///
/// assert_eq!(safe_filename(Some("Cats \"on\" /tmp: 2")), "Cats on tmp 2");
/// assert_eq!(safe_filename(Some("日本語")), "video");
/// assert_eq!(safe_filename(None), "video");
/// ```
pub fn safe_filename(title: Option<&str>) -> String {
    let Some(title) = title else {
        return FALLBACK_FILENAME.to_string();
    };

    let mut out = String::with_capacity(title.len().min(MAX_FILENAME_LEN));
    let mut pending_space = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
        if out.len() >= MAX_FILENAME_LEN {
            break;
        }
    }

    out.truncate(MAX_FILENAME_LEN);
    let trimmed = out.trim_end();
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Get available disk space for a given path
///
/// Returns the number of bytes available to unprivileged users on the
/// filesystem containing `path`. The health endpoint reports this for the
/// temp directory.
///
/// # Errors
///
/// Returns an error if the path does not exist or the platform call fails.
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        // SAFETY: c_path is a valid NUL-terminated string, stat is zeroed
        // before the call and only read after statvfs reports success.
        unsafe {
            let mut stat: libc::statvfs = std::mem::zeroed();
            if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            // f_bavail counts blocks available to unprivileged users
            #[allow(clippy::unnecessary_cast)]
            Ok((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDiskFreeSpaceExW;

        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: wide_path is NUL-terminated and every output pointer refers
        // to a live u64; the outputs are only read after a successful call.
        unsafe {
            let mut free_bytes_available: u64 = 0;
            let mut total_bytes: u64 = 0;
            let mut total_free_bytes: u64 = 0;

            if GetDiskFreeSpaceExW(
                wide_path.as_ptr(),
                &mut free_bytes_available as *mut u64 as *mut _,
                &mut total_bytes as *mut u64 as *mut _,
                &mut total_free_bytes as *mut u64 as *mut _,
            ) == 0
            {
                return Err(std::io::Error::last_os_error());
            }

            Ok(free_bytes_available)
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = path;
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Disk space checking is not supported on this platform",
        ))
    }
}
