use std::path::PathBuf;

/// Path of the host binary installed next to the cli.
pub fn to_host_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("tabtally-host");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}
