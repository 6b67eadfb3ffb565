//! Raw sample output.
//!
//! The stream has no header or framing: one block per epoch, laid out by the
//! configured [`Quantization`](crate::quantize::Quantization).

use crate::error::SynthResult;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Create (or truncate) the output file behind a buffered writer.
pub fn open_sink(path: impl AsRef<Path>) -> SynthResult<BufWriter<File>> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|err| {
        log::error!("cannot open output {}: {}", path.display(), err);
        err
    })?;
    log::info!("writing samples to {}", path.display());
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SynthError;
    use std::io::Write;

    #[test]
    fn missing_directory_is_sink_error() {
        let path = std::env::temp_dir().join("ifsynth-no-such-dir").join("out.bin");
        assert!(matches!(open_sink(&path), Err(SynthError::Sink(_))));
    }

    #[test]
    fn writes_raw_bytes() {
        let path = std::env::temp_dir().join(format!("ifsynth-sink-{}.bin", std::process::id()));
        {
            let mut sink = open_sink(&path).unwrap();
            sink.write_all(&[1, 2, 0xFE]).unwrap();
            sink.flush().unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 0xFE]);
        let _ = std::fs::remove_file(&path);
    }
}
