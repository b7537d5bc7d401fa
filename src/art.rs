use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{
    calc::{self, BUCKET_COUNT},
    errors::HeliartError,
};

/// Artwork file for each 22.5 degree bucket, named after the bucket's starting angle.
pub const FILE_NAMES: [&str; BUCKET_COUNT] = [
    "0.txt", "22.txt", "45.txt", "67.txt", "90.txt", "112.txt", "135.txt", "157.txt", "180.txt",
    "202.txt", "225.txt", "247.txt", "270.txt", "292.txt", "315.txt", "337.txt",
];

macro_rules! embedded {
    ($($name:literal),* $(,)?) => {
        [$(include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/ascii-art/", $name))),*]
    };
}

static EMBEDDED: [&str; BUCKET_COUNT] = embedded!(
    "0.txt", "22.txt", "45.txt", "67.txt", "90.txt", "112.txt", "135.txt", "157.txt", "180.txt",
    "202.txt", "225.txt", "247.txt", "270.txt", "292.txt", "315.txt", "337.txt",
);

/// Where the artwork comes from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ArtSource {
    /// The artwork compiled into the binary.
    #[default]
    Embedded,
    /// A directory holding one file per entry of [`FILE_NAMES`].
    Directory(PathBuf),
}

impl ArtSource {
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        dir.map_or(ArtSource::Embedded, ArtSource::Directory)
    }

    /// The artwork for a bucket, verbatim.
    pub fn load(&self, bucket: usize) -> Result<String, HeliartError> {
        let bucket = bucket % BUCKET_COUNT;
        match self {
            ArtSource::Embedded => Ok(EMBEDDED[bucket].to_string()),
            ArtSource::Directory(dir) => read_art(&dir.join(FILE_NAMES[bucket])),
        }
    }
}

fn read_art(path: &Path) -> Result<String, HeliartError> {
    tracing::debug!(path = %path.display(), "reading artwork");
    fs::read_to_string(path).map_err(|e| HeliartError::file("read artwork", path, e))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_every_bucket_has_embedded_art() {
        for bucket in 0..BUCKET_COUNT {
            let art = ArtSource::Embedded.load(bucket).unwrap();
            assert!(!art.trim().is_empty(), "bucket {bucket}");
        }
    }

    #[test]
    fn test_file_names_follow_bucket_angles() {
        for (bucket, name) in FILE_NAMES.iter().enumerate() {
            let start: usize = name.trim_end_matches(".txt").parse().unwrap();
            assert_eq!(start, (bucket as f64 * calc::BUCKET_WIDTH) as usize);
        }
    }

    #[test]
    fn test_directory_source_is_verbatim() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("180.txt"), "  sunset \n\n").unwrap();

        let source = ArtSource::from_dir(Some(dir.path().to_path_buf()));
        assert_eq!(source.load(calc::select_bucket(180.0)).unwrap(), "  sunset \n\n");
    }

    #[test]
    fn test_missing_art_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let source = ArtSource::Directory(dir.path().to_path_buf());

        let err = source.load(3).unwrap_err();
        assert!(err.to_string().contains("67.txt"), "{err}");
    }

    #[test]
    fn test_full_circle_wraps_to_first_artwork() {
        let source = ArtSource::Embedded;
        assert_eq!(source.load(calc::select_bucket(359.9)).unwrap(), source.load(0).unwrap());
    }
}
