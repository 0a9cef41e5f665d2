//! File transport for encoded IRs.
//!
//! Files are memory-mapped read-only and size-checked before any decoding
//! starts. This layer only moves bytes; all structural checks live in
//! [`crate::serialization`].

use memmap2::Mmap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{CodecConfig, IoConfig};
use crate::core::ir::Ir;
use crate::error::{IrError, Result};
use crate::serialization::DecodeContext;

/// A read-only, size-limited view of a file on disk.
pub struct MappedFile {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
    file_size: u64,
}

impl MappedFile {
    /// Open and map a file, failing with `ResourceExhausted` when it is
    /// larger than `config.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, config: &IoConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limit = config.max_file_size,
            "Opening IR file"
        );

        if file_size > config.max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = config.max_file_size,
                "IR file is too large"
            );
            return Err(IrError::ResourceExhausted {
                resource: "file bytes".to_string(),
                used: usize::try_from(file_size).unwrap_or(usize::MAX),
                limit: usize::try_from(config.max_file_size).unwrap_or(usize::MAX),
            });
        }

        let mmap = if file_size == 0 {
            None
        } else {
            // Safety: read-only map of a regular file opened above.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            file_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.file_size
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

/// Write an IR file, returning the number of bytes written.
pub fn save_ir<P: AsRef<Path>>(path: P, ir: &Ir) -> Result<u64> {
    let path = path.as_ref();
    let bytes = ir.to_bytes()?;
    fs::write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "Saved IR");
    Ok(bytes.len() as u64)
}

/// Load an IR file with the standard AuxData schema.
pub fn load_ir<P: AsRef<Path>>(path: P, io: &IoConfig, codec: &CodecConfig) -> Result<Ir> {
    let ctx = DecodeContext {
        codec: codec.clone(),
        ..DecodeContext::default()
    };
    load_ir_with(path, io, &ctx)
}

pub fn load_ir_with<P: AsRef<Path>>(path: P, io: &IoConfig, ctx: &DecodeContext) -> Result<Ir> {
    let file = MappedFile::open(path, io)?;
    let ir = Ir::from_bytes_with(file.as_bytes(), ctx)?;
    info!(
        path = %file.path().display(),
        modules = ir.modules().len(),
        "Loaded IR"
    );
    Ok(ir)
}

/// Outcome of decoding a file and encoding it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripReport {
    pub path: PathBuf,
    pub modules: usize,
    pub original_len: usize,
    pub reencoded_len: usize,
    /// Offset of the first differing byte, if any.
    pub first_difference: Option<usize>,
}

impl RoundTripReport {
    pub fn is_identical(&self) -> bool {
        self.first_difference.is_none()
    }
}

/// Decode an IR file and re-encode it, reporting where the bytes diverge.
pub fn roundtrip_file<P: AsRef<Path>>(path: P) -> Result<RoundTripReport> {
    roundtrip_file_with(path, &IoConfig::default(), &DecodeContext::default())
}

/// [`roundtrip_file`] under explicit file limits, codec settings and AuxData
/// schema.
pub fn roundtrip_file_with<P: AsRef<Path>>(
    path: P,
    io: &IoConfig,
    ctx: &DecodeContext,
) -> Result<RoundTripReport> {
    let file = MappedFile::open(path, io)?;
    let original = file.as_bytes();
    let ir = Ir::from_bytes_with(original, ctx)?;
    let reencoded = ir.to_bytes()?;

    let first_difference = original
        .iter()
        .zip(reencoded.iter())
        .position(|(a, b)| a != b)
        .or_else(|| (original.len() != reencoded.len()).then(|| original.len().min(reencoded.len())));

    if let Some(offset) = first_difference {
        warn!(path = %file.path().display(), offset, "Re-encoded IR differs");
    }

    Ok(RoundTripReport {
        path: file.path().to_path_buf(),
        modules: ir.modules().len(),
        original_len: original.len(),
        reencoded_len: reencoded.len(),
        first_difference,
    })
}
