use std::sync::Once;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;

static INIT: Once = Once::new();

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default `info` filter.
/// Safe to call more than once; later calls do nothing.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another subscriber may already be installed by the host application
        let _ = fmt().with_env_filter(filter).with_target(false).try_init();
    });
}

/// Runs `f` under a thread-local subscriber and returns everything it logged.
#[cfg(test)]
pub(crate) fn capture<F: FnOnce()>(f: F) -> String {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut inner) = self.0.lock() {
                inner.extend_from_slice(bytes);
            }
            return Ok(bytes.len());
        }

        fn flush(&mut self) -> std::io::Result<()> {
            return Ok(());
        }
    }

    let buffer = Buffer(Arc::new(Mutex::new(Vec::new())));
    let writer = buffer.clone();
    let subscriber = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().map(|b| b.clone()).unwrap_or_default();
    return String::from_utf8_lossy(&bytes).into_owned();
}
