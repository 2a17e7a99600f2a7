//! Integration test for importing create info and loading from it.

mod common;

use common::{sample_mesh, ParkingLoader, MESH};
use kiln_resource::{
    CreateInfo, LoadStatus, LoadedData, PostLoad, Resource, ResourceError, ResourceFns,
    ResourceId, ResourceImporter, ResourceState, Task,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Importer that hands out a new description on every call.
#[derive(Default)]
struct CountingImporter {
    calls: AtomicUsize,
}

impl CountingImporter {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResourceImporter for CountingImporter {
    fn import(&self, id: ResourceId) -> Option<CreateInfo> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Some(CreateInfo::new(MESH, format!("mesh-{}-{call}.gltf", id.0)))
    }
}

fn importing_resource(fns: ResourceFns) -> (Resource, Arc<CountingImporter>) {
    let importer = Arc::new(CountingImporter::default());
    let fns = fns.with_importer(importer.clone());
    let resource = Resource::new(ResourceId::new(0x1c), MESH, Arc::new(fns));
    (resource, importer)
}

fn path(info: &CreateInfo) -> &str {
    info.data::<String>().unwrap()
}

#[test]
fn test_import_without_importer() {
    let resource = Resource::new(ResourceId::new(1), MESH, Arc::new(ResourceFns::new()));

    assert_eq!(
        resource.import_create_info(),
        Err(ResourceError::ImporterNotProvided(ResourceId::new(1)))
    );
    assert!(resource.state().is_unloaded());
    assert!(resource.create_info().is_none());
}

#[test]
fn test_synchronous_import() {
    let (resource, importer) = importing_resource(ResourceFns::new());

    assert_eq!(resource.import_create_info(), Ok(LoadStatus::Started));
    assert_eq!(importer.calls(), 1);
    assert!(resource.state().is_unloaded());
    assert_eq!(resource.ref_count(), 1);

    let info = resource.create_info().unwrap();
    assert_eq!(info.ref_count(), 2);
    assert_eq!(info.resource_type(), MESH);
    assert_eq!(path(&info), "mesh-28-0.gltf");
    assert!(resource.loaded_create_info().is_none());
}

#[test]
fn test_reimport_replaces_create_info() {
    let (resource, _importer) = importing_resource(ResourceFns::new());

    resource.import_create_info().unwrap();
    let first = resource.create_info().unwrap();
    resource.import_create_info().unwrap();
    let second = resource.create_info().unwrap();

    assert_ne!(first, second);
    assert_eq!(first.ref_count(), 1);
    assert_eq!(second.ref_count(), 2);
    assert_eq!(path(&first), "mesh-28-0.gltf");
    assert_eq!(path(&second), "mesh-28-1.gltf");
}

#[test]
fn test_import_returning_none_keeps_create_info() {
    let first = Arc::new(Mutex::new(true));
    let switch = Arc::clone(&first);
    let fns = ResourceFns::new().with_importer(Arc::new(move |_: ResourceId| {
        let mut first = switch.lock();
        if *first {
            *first = false;
            Some(CreateInfo::new(MESH, String::from("kept.gltf")))
        } else {
            None
        }
    }));
    let resource = Resource::new(ResourceId::new(2), MESH, Arc::new(fns));

    resource.import_create_info().unwrap();
    resource.import_create_info().unwrap();

    assert_eq!(path(&resource.create_info().unwrap()), "kept.gltf");
    assert!(resource.state().is_unloaded());
}

#[test]
fn test_scheduled_import_and_parallel_guard() {
    let queued: Arc<Mutex<Vec<Task>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&queued);
    let loader = Arc::new(ParkingLoader::default());
    let (resource, importer) = importing_resource(
        ResourceFns::new()
            .with_loader(loader.clone())
            .with_scheduler(Arc::new(move |task: Task| sink.lock().push(task))),
    );

    assert_eq!(resource.import_create_info(), Ok(LoadStatus::Started));
    assert_eq!(resource.state(), ResourceState::LOADING);
    assert_eq!(resource.ref_count(), 2);
    assert_eq!(importer.calls(), 0);

    assert_eq!(resource.import_create_info(), Ok(LoadStatus::AlreadyLoading));
    assert_eq!(resource.load_data(), Ok(LoadStatus::AlreadyLoading));
    assert_eq!(queued.lock().len(), 1);

    let task = queued.lock().pop().unwrap();
    task();
    assert_eq!(importer.calls(), 1);
    assert!(resource.state().is_unloaded());
    assert_eq!(resource.ref_count(), 1);
    assert!(resource.create_info().is_some());
    assert_eq!(loader.calls(), 0);
}

#[test]
fn test_load_imports_only_when_needed() {
    let loader = Arc::new(ParkingLoader::default());
    let (resource, importer) = importing_resource(ResourceFns::new().with_loader(loader.clone()));

    resource.load_data().unwrap();
    assert_eq!(importer.calls(), 1);
    let token = loader.take();
    let info = token.create_info().unwrap();
    assert_eq!(path(&info), "mesh-28-0.gltf");
    token.succeed(LoadedData::new(MESH, sample_mesh()).with_create_info(info.clone()));

    assert_eq!(resource.state(), ResourceState::LOADED);
    assert_eq!(resource.loaded_create_info(), Some(info.clone()));
    assert_eq!(info.ref_count(), 3);

    resource.load_data().unwrap();
    assert_eq!(importer.calls(), 1);
    let token = loader.take();
    assert_eq!(token.create_info(), Some(info.clone()));
    token.succeed(LoadedData::new(MESH, sample_mesh()).with_create_info(info.clone()));
    assert_eq!(resource.iteration(), 2);
    assert_eq!(info.ref_count(), 3);
}

#[test]
fn test_refreshing_load_reimports() {
    let loader = Arc::new(ParkingLoader::default());
    let (resource, importer) = importing_resource(ResourceFns::new().with_loader(loader.clone()));

    resource.load_data().unwrap();
    let token = loader.take();
    let first = token.create_info().unwrap();
    token.succeed(LoadedData::new(MESH, sample_mesh()).with_create_info(first.clone()));

    resource.load_data_with(true).unwrap();
    assert_eq!(importer.calls(), 2);
    let token = loader.take();
    let second = token.create_info().unwrap();
    assert_ne!(first, second);

    // Until the reload completes the data still belongs to the first import.
    assert_eq!(resource.loaded_create_info(), Some(first.clone()));
    assert_eq!(first.ref_count(), 2);

    token.succeed(LoadedData::new(MESH, sample_mesh()).with_create_info(second.clone()));
    assert_eq!(first.ref_count(), 1);
    assert_eq!(resource.loaded_create_info(), Some(second.clone()));
    assert_eq!(resource.create_info(), Some(second));
}

#[test]
fn test_unload_releases_loaded_create_info() {
    let loader = Arc::new(|post_load: PostLoad| {
        let info = post_load.create_info();
        let mut loaded = LoadedData::new(MESH, sample_mesh());
        if let Some(info) = info {
            loaded = loaded.with_create_info(info);
        }
        post_load.succeed(loaded);
    });
    let (resource, _importer) = importing_resource(ResourceFns::new().with_loader(loader));

    resource.load_data().unwrap();
    let info = resource.loaded_create_info().unwrap();
    assert_eq!(resource.create_info(), Some(info.clone()));
    assert_eq!(info.ref_count(), 3);

    resource.unload_data(true);
    assert!(resource.loaded_create_info().is_none());
    assert_eq!(info.ref_count(), 2);

    drop(resource);
    assert_eq!(info.ref_count(), 1);
}

#[test]
fn test_undefined_load_carries_create_info_to_replacement() {
    let importer = Arc::new(CountingImporter::default());
    let fns = ResourceFns::new()
        .with_importer(importer.clone())
        .with_loader(Arc::new(|post_load: PostLoad| {
            let info = post_load.create_info().unwrap();
            post_load.succeed(LoadedData::new(info.resource_type(), 9_u8).with_create_info(info));
        }));
    let resource = Resource::undefined(ResourceId::new(3), Arc::new(fns));

    resource.load_data().unwrap();
    let typed = resource.replacement().unwrap();
    assert_eq!(typed.resource_type(), MESH);
    assert_eq!(path(&typed.loaded_create_info().unwrap()), "mesh-3-0.gltf");
    assert_eq!(importer.calls(), 1);
}
