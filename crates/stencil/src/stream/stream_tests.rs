#![allow(non_snake_case)]

use crate::Stencil;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use stencil_core::{ClassRegistry, Config, Formatters, StencilError, Type, Value};

/// Shared buffer the fmt subscriber writes log lines into
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, captured.text())
}

fn stencil() -> Stencil<ClassRegistry> {
    Stencil::new(ClassRegistry::new(), Formatters::new(), Config::new())
}

fn int() -> Type {
    Type::Int
}

#[test]
fn ListStream___next_boundary___yields_element_ranges() {
    let stencil = stencil();
    let mut resource = Cursor::new(b"[1, 22]".to_vec());
    let mut stream = stencil.stream_list(&mut resource, &int()).unwrap();

    let first = stream.next_boundary().unwrap().unwrap();
    let second = stream.next_boundary().unwrap().unwrap();

    assert_eq!((first.offset, first.length), (1, 1));
    assert_eq!((second.offset, second.length), (4, 2));
    assert_eq!(stream.next_boundary().unwrap(), None);
}

#[test]
fn ListStream___element_decode_failure___logs_and_closes_stream() {
    let stencil = stencil();
    let mut resource = Cursor::new(br#"[1, "two", 3]"#.to_vec());

    let (items, logs) = with_logs(|| {
        let stream = stencil.stream_list(&mut resource, &int()).unwrap();
        stream.collect::<Vec<_>>()
    });

    assert_eq!(items.len(), 2);
    assert_eq!(*items[0].as_ref().unwrap(), Value::Int(1));
    assert!(matches!(items[1], Err(StencilError::UnexpectedValue { .. })));
    assert!(logs.contains("element decode failed, stream closed"), "{logs}");
    assert!(logs.contains("offset=4"), "{logs}");
}

#[test]
fn ListStream___scan_failure___logs_and_closes_stream() {
    let stencil = stencil();
    let mut resource = Cursor::new(b"[1 2]".to_vec());

    let (items, logs) = with_logs(|| {
        let stream = stencil.stream_list(&mut resource, &int()).unwrap();
        stream.collect::<Vec<_>>()
    });

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(StencilError::MalformedInput(_))));
    assert!(logs.contains("list scan failed, stream closed"), "{logs}");
}

#[test]
fn ListStream___trailing_input___fails_at_the_last_element() {
    let stencil = stencil();
    let mut resource = Cursor::new(b"[1, 2] x".to_vec());

    let items: Vec<_> = stencil.stream_list(&mut resource, &int()).unwrap().collect();

    assert_eq!(items.len(), 2);
    assert_eq!(*items[0].as_ref().unwrap(), Value::Int(1));
    assert!(matches!(items[1], Err(StencilError::MalformedInput(_))));
}
