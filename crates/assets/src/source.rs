use std::path::{Path, PathBuf};

use rally_kernel::VehicleModel;

use crate::descriptor::{VehicleCatalog, VehicleDescriptor};
use crate::store::AssetStore;
use crate::AssetError;

/// Anything that can produce vehicles by catalog index.
pub trait VehicleSource {
    /// Number of selectable vehicles. Never zero for a usable source.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build vehicle `index`, registering its meshes in `store`.
    fn load(&mut self, index: usize, store: &mut AssetStore) -> Result<VehicleModel, AssetError>;
}

/// Vehicles held as in-memory descriptors.
#[derive(Debug, Clone)]
pub struct MemoryVehicleSource {
    descriptors: Vec<VehicleDescriptor>,
}

impl MemoryVehicleSource {
    pub fn new(descriptors: Vec<VehicleDescriptor>) -> Self {
        Self { descriptors }
    }

    /// A single built-in demo car.
    pub fn demo() -> Self {
        Self::new(vec![VehicleDescriptor::demo()])
    }
}

impl VehicleSource for MemoryVehicleSource {
    fn len(&self) -> usize {
        self.descriptors.len()
    }

    fn load(&mut self, index: usize, store: &mut AssetStore) -> Result<VehicleModel, AssetError> {
        let count = self.descriptors.len();
        let descriptor = self
            .descriptors
            .get(index)
            .ok_or(AssetError::NoSuchVehicle { index, count })?;
        Ok(descriptor.build(store))
    }
}

/// Vehicles described by a JSON catalog on disk.
#[derive(Debug, Clone)]
pub struct JsonVehicleSource {
    catalog_path: PathBuf,
    paths: Vec<PathBuf>,
}

impl JsonVehicleSource {
    /// Read the catalog. Descriptor files are only read on `load`.
    pub fn open(catalog_path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let catalog_path = catalog_path.as_ref().to_path_buf();
        let data =
            std::fs::read_to_string(&catalog_path).map_err(|e| AssetError::io(&catalog_path, e))?;
        let catalog: VehicleCatalog =
            serde_json::from_str(&data).map_err(|e| AssetError::json(&catalog_path, e))?;
        if catalog.paths.is_empty() {
            return Err(AssetError::EmptyCatalog(catalog_path));
        }
        let base = catalog_path.parent().unwrap_or(Path::new("."));
        let paths = catalog.paths.iter().map(|p| base.join(p)).collect();
        tracing::debug!(path = %catalog_path.display(), "vehicle catalog opened");
        Ok(Self {
            catalog_path,
            paths,
        })
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn descriptor_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Read and validate descriptor `index`.
    pub fn descriptor(&self, index: usize) -> Result<VehicleDescriptor, AssetError> {
        let path = self.paths.get(index).ok_or(AssetError::NoSuchVehicle {
            index,
            count: self.paths.len(),
        })?;
        let data = std::fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
        let descriptor: VehicleDescriptor =
            serde_json::from_str(&data).map_err(|e| AssetError::json(path, e))?;
        let problems = descriptor.problems();
        if !problems.is_empty() {
            return Err(AssetError::Invalid {
                path: path.clone(),
                reason: problems.join("; "),
            });
        }
        Ok(descriptor)
    }
}

impl VehicleSource for JsonVehicleSource {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn load(&mut self, index: usize, store: &mut AssetStore) -> Result<VehicleModel, AssetError> {
        let _span = tracing::info_span!("load_vehicle", index).entered();
        let descriptor = self.descriptor(index)?;
        let vehicle = descriptor.build(store);
        tracing::info!(name = vehicle.name(), parts = vehicle.parts().len(), "vehicle loaded");
        Ok(vehicle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_catalog(dir: &Path, descriptors: &[(&str, &VehicleDescriptor)]) -> PathBuf {
        fs::create_dir_all(dir.join("cars")).unwrap();
        let mut paths = Vec::new();
        for (name, d) in descriptors {
            let rel = format!("cars/{name}.json");
            fs::write(dir.join(&rel), serde_json::to_string_pretty(d).unwrap()).unwrap();
            paths.push(rel);
        }
        let catalog = dir.join("vehicles.json");
        fs::write(
            &catalog,
            serde_json::to_string(&VehicleCatalog { paths }).unwrap(),
        )
        .unwrap();
        catalog
    }

    #[test]
    fn loads_vehicles_relative_to_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let mut red = VehicleDescriptor::demo();
        red.name = "Red".into();
        let mut blue = VehicleDescriptor::demo();
        blue.name = "Blue".into();
        let catalog = write_catalog(tmp.path(), &[("red", &red), ("blue", &blue)]);

        let mut source = JsonVehicleSource::open(&catalog).unwrap();
        assert_eq!(source.len(), 2);
        let mut store = AssetStore::new();
        let v = source.load(1, &mut store).unwrap();
        assert_eq!(v.name(), "Blue");
        assert!(!store.is_empty());
    }

    #[test]
    fn bundled_catalog_loads() {
        let catalog = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/vehicles/vehicles.json");
        let mut source = JsonVehicleSource::open(&catalog).unwrap();
        assert_eq!(source.len(), 3);
        let mut store = AssetStore::new();
        let names: Vec<String> = (0..source.len())
            .map(|i| source.load(i, &mut store).unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["Roadster", "Truck", "Buggy"]);
    }

    #[test]
    fn index_out_of_range() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = write_catalog(tmp.path(), &[("demo", &VehicleDescriptor::demo())]);
        let mut source = JsonVehicleSource::open(&catalog).unwrap();
        let err = source.load(3, &mut AssetStore::new()).unwrap_err();
        assert!(matches!(err, AssetError::NoSuchVehicle { index: 3, count: 1 }));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = tmp.path().join("vehicles.json");
        fs::write(&catalog, r#"{ "paths": [] }"#).unwrap();
        assert!(matches!(
            JsonVehicleSource::open(&catalog),
            Err(AssetError::EmptyCatalog(_))
        ));
    }

    #[test]
    fn missing_descriptor_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = tmp.path().join("vehicles.json");
        fs::write(&catalog, r#"{ "paths": ["nope.json"] }"#).unwrap();
        let mut source = JsonVehicleSource::open(&catalog).unwrap();
        assert!(matches!(
            source.load(0, &mut AssetStore::new()),
            Err(AssetError::Io { .. })
        ));
    }

    #[test]
    fn invalid_descriptor_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut broken = VehicleDescriptor::demo();
        broken.chassis.boxes.clear();
        let catalog = write_catalog(tmp.path(), &[("broken", &broken)]);
        let source = JsonVehicleSource::open(&catalog).unwrap();
        let err = source.descriptor(0).unwrap_err();
        assert!(err.to_string().contains("chassis has no boxes"));
    }

    #[test]
    fn memory_source_builds_demo() {
        let mut source = MemoryVehicleSource::demo();
        assert_eq!(source.len(), 1);
        let v = source.load(0, &mut AssetStore::new()).unwrap();
        assert_eq!(v.name(), "Demo");
        assert!(source.load(1, &mut AssetStore::new()).is_err());
    }
}
