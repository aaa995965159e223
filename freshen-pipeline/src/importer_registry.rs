use crate::{Importer, ImporterId, PipelineError, PipelineResult};
use freshen_base::hashing::HashMap;
use std::path::Path;
use std::sync::Arc;
use type_uuid::TypeUuid;

// Keeps track of all known importers
pub struct ImporterRegistryInner {
    registered_importers: HashMap<ImporterId, Arc<dyn Importer>>,
    // Resolution scans in registration order, first can_handle() match wins
    registration_order: Vec<ImporterId>,
    file_extension_associations: HashMap<String, Vec<ImporterId>>,
}

#[derive(Clone)]
pub struct ImporterRegistry {
    inner: Arc<ImporterRegistryInner>,
}

impl ImporterRegistry {
    pub fn importers_for_file_extension(
        &self,
        extension: &str,
    ) -> &[ImporterId] {
        const EMPTY_LIST: &'static [ImporterId] = &[];
        self.inner
            .file_extension_associations
            .get(extension)
            .map(|x| x.as_slice())
            .unwrap_or(EMPTY_LIST)
    }

    pub fn importer(
        &self,
        importer_id: ImporterId,
    ) -> Option<&Arc<dyn Importer>> {
        self.inner.registered_importers.get(&importer_id)
    }

    /// Find the importer that owns a path. Linear scan in registration order;
    /// importer counts are small (dozens) so no index is kept.
    pub fn resolve(
        &self,
        path: &Path,
    ) -> Option<&Arc<dyn Importer>> {
        for importer_id in &self.inner.registration_order {
            let importer = &self.inner.registered_importers[importer_id];
            if importer.can_handle(path) {
                return Some(importer);
            }
        }

        None
    }
}

#[derive(Default)]
pub struct ImporterRegistryBuilder {
    registered_importers: HashMap<ImporterId, Arc<dyn Importer>>,
    registration_order: Vec<ImporterId>,
    file_extension_associations: HashMap<String, Vec<ImporterId>>,
}

impl ImporterRegistryBuilder {
    pub fn register_handler<T: TypeUuid + Importer + Default>(&mut self) -> PipelineResult<()> {
        self.register_handler_instance(Arc::new(T::default()))
    }

    pub fn register_handler_instance(
        &mut self,
        importer: Arc<dyn Importer>,
    ) -> PipelineResult<()> {
        let importer_id = importer.importer_id();
        if self.registered_importers.contains_key(&importer_id) {
            return Err(PipelineError::DuplicateImporter(importer_id));
        }

        for extension in importer.supported_file_extensions() {
            let associations = self
                .file_extension_associations
                .entry(extension.to_string())
                .or_default();
            if let Some(first) = associations.first() {
                // First-registered wins at resolve time, the newcomer is
                // shadowed for this extension but stays registered
                log::warn!(
                    "Importer {:?} also claims extension {:?} already claimed by {:?}, it will be shadowed",
                    importer_id,
                    extension,
                    first
                );
            }
            associations.push(importer_id);
        }

        self.registered_importers.insert(importer_id, importer);
        self.registration_order.push(importer_id);
        Ok(())
    }

    pub fn build(self) -> ImporterRegistry {
        let inner = ImporterRegistryInner {
            registered_importers: self.registered_importers,
            registration_order: self.registration_order,
            file_extension_associations: self.file_extension_associations,
        };

        ImporterRegistry {
            inner: Arc::new(inner),
        }
    }
}
