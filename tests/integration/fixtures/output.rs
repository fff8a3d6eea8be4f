use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use reviewnotes::export::ExportOutput;

/// Cloneable in-memory writer for capturing progress and diagnostics.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().expect("buffer lock").clone()).expect("utf8 output")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Captured export streams.
pub struct Captured {
    pub progress: SharedBuf,
    pub diagnostics: SharedBuf,
}

pub fn capture() -> (Captured, ExportOutput) {
    let progress = SharedBuf::default();
    let diagnostics = SharedBuf::default();
    let output = ExportOutput {
        progress: Box::new(progress.clone()),
        diagnostics: Box::new(diagnostics.clone()),
    };
    (
        Captured {
            progress,
            diagnostics,
        },
        output,
    )
}
