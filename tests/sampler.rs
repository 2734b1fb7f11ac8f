use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use pvemon::logging::LocalizedTime;
use pvemon::sampler::{self, Mode, Sampler, SamplerError};
use pvemon::store::{RoundRobinStore, StoreError, StoreLayout};

#[derive(Default)]
struct FakeStore {
    updates: RefCell<Vec<(i64, f64)>>,
    broken: bool,
}

impl RoundRobinStore for FakeStore {
    fn exists(&self) -> bool {
        true
    }

    fn create(&self, _layout: &StoreLayout) -> Result<(), StoreError> {
        Ok(())
    }

    fn update(&self, timestamp: i64, value: f64) -> Result<(), StoreError> {
        if self.broken {
            return Err(StoreError::Missing(PathBuf::from("gone.rrd")));
        }
        self.updates.borrow_mut().push((timestamp, value));
        Ok(())
    }
}

fn zone(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{content}").unwrap();
    file
}

#[test]
fn test_single_sample() {
    let source = zone("45000\n");
    let (_tx, rx) = mpsc::channel();

    let sampler = Sampler::new(FakeStore::default(), 100)
        .with_source(source.path())
        .quiet(true);
    let cycles = sampler.run(Mode::Once, &rx).unwrap();

    assert_eq!(cycles, 1);
    let updates = sampler.store().updates.borrow();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, 45.0);
}

#[test]
fn test_interrupt_stops_continuous_sampling() {
    let source = zone("51500\n");
    let (tx, rx) = mpsc::channel();
    tx.send(()).unwrap();

    let sampler = Sampler::new(FakeStore::default(), 300)
        .with_source(source.path())
        .quiet(true);
    let cycles = sampler.run(Mode::Continuous, &rx).unwrap();

    assert_eq!(cycles, 1);
    assert_eq!(sampler.store().updates.borrow()[0].1, 51.5);
}

#[test]
fn test_dropped_sender_stops_continuous_sampling() {
    let source = zone("45000\n");
    let (tx, rx) = mpsc::channel::<()>();
    drop(tx);

    let sampler = Sampler::new(FakeStore::default(), 10)
        .with_source(source.path())
        .quiet(true);
    assert_eq!(sampler.run(Mode::Continuous, &rx).unwrap(), 1);
}

#[test]
fn test_failed_read_writes_nothing() {
    let source = zone("1\n");
    let (_tx, rx) = mpsc::channel();

    let sampler = Sampler::new(FakeStore::default(), 100).with_source(source.path());
    let sample = sampler.sample_once().unwrap();

    assert_eq!(sample.celsius, None);
    assert!(sampler.store().updates.borrow().is_empty());
    assert_eq!(sampler.run(Mode::Once, &rx).unwrap(), 1);
}

#[test]
fn test_store_failure_is_fatal() {
    let source = zone("45000\n");
    let (_tx, rx) = mpsc::channel();

    let store = FakeStore {
        broken: true,
        ..FakeStore::default()
    };
    let sampler = Sampler::new(store, 100)
        .with_source(source.path())
        .quiet(true);

    let err = sampler.run(Mode::Continuous, &rx).unwrap_err();
    assert!(matches!(err, SamplerError::Store(StoreError::Missing(_))));
}

#[test]
fn test_step_is_clamped() {
    assert_eq!(Sampler::new(FakeStore::default(), 1).step(), Duration::from_secs(10));
    assert_eq!(Sampler::new(FakeStore::default(), 3600).step(), Duration::from_secs(300));
    assert_eq!(Sampler::new(FakeStore::default(), 60).step(), Duration::from_secs(60));
}

#[test]
fn test_read_test_without_store() {
    let source = zone("47250\n");
    let (tx, rx) = mpsc::channel();
    tx.send(()).unwrap();

    let readings = sampler::read_test(
        source.path(),
        Duration::from_secs(5),
        &LocalizedTime::default(),
        &rx,
    );
    assert_eq!(readings, vec![Some(47.25)]);
}

#[test]
fn test_read_test_reports_failed_reads() {
    let (tx, rx) = mpsc::channel();
    tx.send(()).unwrap();

    let readings = sampler::read_test(
        Path::new("/nonexistent/thermal/temp"),
        Duration::from_secs(5),
        &LocalizedTime::default(),
        &rx,
    );
    assert_eq!(readings, vec![None]);
}
