use std::io;
use std::sync::{Arc, Mutex};

use integration_tests::TestApp;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_every_response_is_logged_at_info() {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer(captured.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let app = TestApp::new();
    app.get("/api/posts/").await;
    app.get("/api/post/abc123").await;

    let log = captured.text();
    assert_eq!(log.matches("finished processing request").count(), 2, "{log}");
    assert!(log.contains("route=/api/posts/"), "{log}");
    assert!(log.contains("route=/api/post/{id}"), "{log}");
    assert!(log.contains("path=/api/post/abc123"), "{log}");
    assert!(log.contains("status=200"), "{log}");
    assert!(log.contains("status=500"), "{log}");
}
