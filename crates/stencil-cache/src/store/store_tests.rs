#![allow(non_snake_case)]

use super::*;
use stencil_core::{ClassDef, ClassRegistry, Direction, FieldDef, Flavor, Strategy, Type};
use tempfile::TempDir;

fn registry() -> ClassRegistry {
    ClassRegistry::new().with_class(
        "User",
        ClassDef::new()
            .field(FieldDef::new("id", Type::Int))
            .field(FieldDef::new("name", Type::String)),
    )
}

fn key(ty: &str) -> CacheKey {
    CacheKey::new(
        ty.parse().unwrap(),
        Direction::Decode,
        Flavor::String,
        Strategy::Lazy,
        &Config::new(),
    )
}

#[test]
fn TemplateCache___ensure_twice___generates_once_with_identical_bytes() {
    let dir = TempDir::new().unwrap();
    let cache = TemplateCache::new(dir.path());
    let key = key("list<User>");

    let first = cache.ensure_path(&key, &registry(), &Config::new()).unwrap();
    let first_bytes = std::fs::read(&first).unwrap();
    let second = cache.ensure_path(&key, &registry(), &Config::new()).unwrap();
    let second_bytes = std::fs::read(&second).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(cache.generated(), 1);
}

#[test]
fn TemplateCache___file_from_earlier_process___is_loaded_not_regenerated() {
    let dir = TempDir::new().unwrap();
    let key = key("User");
    let written = TemplateCache::new(dir.path())
        .ensure(&key, &registry(), &Config::new())
        .unwrap();

    let cache = TemplateCache::new(dir.path());
    let loaded = cache.ensure(&key, &registry(), &Config::new()).unwrap();

    assert_eq!(*loaded, *written);
    assert_eq!(cache.generated(), 0);
}

#[test]
fn TemplateCache___force_regenerate___rebuilds_every_time() {
    let dir = TempDir::new().unwrap();
    let cache = TemplateCache::new(dir.path());
    let mut config = Config::new();
    config.force_regenerate = true;

    cache.ensure(&key("User"), &registry(), &config).unwrap();
    cache.ensure(&key("User"), &registry(), &config).unwrap();

    assert_eq!(cache.generated(), 2);
}

#[test]
fn TemplateCache___missing_directory___created_on_demand() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");
    let cache = TemplateCache::new(&nested);

    let path = cache.ensure_path(&key("User"), &registry(), &Config::new()).unwrap();

    assert!(path.starts_with(&nested));
    assert!(path.is_file());
    assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 1);
}

#[test]
fn TemplateCache___deleted_file___is_rewritten_by_ensure_path() {
    let dir = TempDir::new().unwrap();
    let cache = TemplateCache::new(dir.path());
    let path = cache.ensure_path(&key("User"), &registry(), &Config::new()).unwrap();
    std::fs::remove_file(&path).unwrap();

    cache.ensure_path(&key("User"), &registry(), &Config::new()).unwrap();

    assert!(path.is_file());
    assert_eq!(cache.generated(), 2);
}

#[test]
fn TemplateCache___corrupt_file___regenerates() {
    let dir = TempDir::new().unwrap();
    let key = key("User");
    let cache = TemplateCache::new(dir.path());
    let path = cache.path(&key).unwrap();
    std::fs::write(&path, b"not json").unwrap();

    let template = cache.ensure(&key, &registry(), &Config::new()).unwrap();

    assert_eq!(template.key, key);
    assert_eq!(Template::from_bytes(&std::fs::read(&path).unwrap()).unwrap(), *template);
}

#[test]
fn TemplateCache___clear___removes_only_template_files() {
    let dir = TempDir::new().unwrap();
    let cache = TemplateCache::new(dir.path());
    cache.ensure(&key("User"), &registry(), &Config::new()).unwrap();
    cache.ensure(&key("list<int>"), &registry(), &Config::new()).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

    let removed = cache.clear().unwrap();

    assert_eq!(removed, 2);
    assert!(cache.is_empty());
    assert!(dir.path().join("notes.txt").is_file());
}

#[test]
fn TemplateCache___invalidate___forces_next_ensure_to_generate() {
    let dir = TempDir::new().unwrap();
    let cache = TemplateCache::new(dir.path());
    let key = key("User");
    cache.ensure(&key, &registry(), &Config::new()).unwrap();

    cache.invalidate(&key).unwrap();
    cache.ensure(&key, &registry(), &Config::new()).unwrap();

    assert_eq!(cache.generated(), 2);
}

#[test]
fn TemplateCache___in_memory___has_no_path() {
    let cache = TemplateCache::in_memory();
    let key = key("User");

    cache.ensure(&key, &registry(), &Config::new()).unwrap();

    assert!(cache.path(&key).is_none());
    assert!(cache.ensure_path(&key, &registry(), &Config::new()).is_err());
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.clear().unwrap(), 0);
}

#[test]
fn TemplateCache___concurrent_ensure___leaves_one_complete_file() {
    let dir = TempDir::new().unwrap();
    let key = key("list<User>");

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                TemplateCache::new(dir.path())
                    .ensure(&key, &registry(), &Config::new())
                    .unwrap();
            });
        }
    });

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
    let path = TemplateCache::new(dir.path()).path(&key).unwrap();
    let template = Template::from_bytes(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(template.key, key);
}
