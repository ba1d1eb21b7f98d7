//! The table catalog: name to table-id to file-and-schema mapping.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::heap_file::HeapFile;
use crate::tuple::TupleDesc;
use crate::TableId;

#[derive(Default)]
struct CatalogState {
    files: HashMap<TableId, Arc<HeapFile>>,
    names: HashMap<TableId, String>,
    ids_by_name: HashMap<String, TableId>,
}

/// Registry of the tables known to the engine. The buffer pool resolves
/// page ids to heap files through it.
#[derive(Default)]
pub struct Catalog {
    state: Mutex<CatalogState>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    /// Registers `file` under `name`, returning its table id. Registering a
    /// second table under an existing name replaces the first.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str) -> TableId {
        let mut state = self.state.lock();
        let id = file.id();
        if let Some(old) = state.ids_by_name.insert(name.to_string(), id) {
            if old != id {
                state.files.remove(&old);
                state.names.remove(&old);
            }
        }
        state.files.insert(id, file);
        state.names.insert(id, name.to_string());
        id
    }

    pub fn file_for(&self, table_id: TableId) -> Option<Arc<HeapFile>> {
        self.state.lock().files.get(&table_id).cloned()
    }

    pub fn tuple_desc(&self, table_id: TableId) -> Option<TupleDesc> {
        self.file_for(table_id).map(|file| file.tuple_desc().clone())
    }

    pub fn table_name(&self, table_id: TableId) -> Option<String> {
        self.state.lock().names.get(&table_id).cloned()
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.state.lock().ids_by_name.get(name).copied()
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.state.lock().files.keys().copied().collect()
    }

    /// Empties the catalog. Test hook.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.files.clear();
        state.names.clear();
        state.ids_by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{FieldType, TdItem};
    use tempfile::tempdir;

    fn desc() -> TupleDesc {
        TupleDesc::new(vec![TdItem::new(FieldType::Int, "value")])
    }

    #[test]
    fn same_path_yields_same_table_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");
        let a = HeapFile::open(&path, desc()).unwrap();
        let b = HeapFile::open(&path, desc()).unwrap();
        assert_eq!(a.id(), b.id());

        let other = HeapFile::open(dir.path().join("u.dat"), desc()).unwrap();
        assert_ne!(a.id(), other.id());
    }

    #[test]
    fn lookups_resolve_registered_tables() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let file = Arc::new(HeapFile::open(dir.path().join("t.dat"), desc()).unwrap());
        let id = catalog.add_table(Arc::clone(&file), "things");

        assert_eq!(catalog.table_id("things"), Some(id));
        assert_eq!(catalog.table_name(id).as_deref(), Some("things"));
        assert_eq!(catalog.tuple_desc(id), Some(desc()));
        assert!(catalog.file_for(id).is_some());
        assert!(catalog.file_for(id ^ 1).is_none());
    }

    #[test]
    fn reregistering_a_name_replaces_the_table() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let first = Arc::new(HeapFile::open(dir.path().join("a.dat"), desc()).unwrap());
        let second = Arc::new(HeapFile::open(dir.path().join("b.dat"), desc()).unwrap());
        let first_id = catalog.add_table(first, "things");
        let second_id = catalog.add_table(second, "things");

        assert_eq!(catalog.table_id("things"), Some(second_id));
        assert!(catalog.file_for(first_id).is_none());
        assert_eq!(catalog.table_ids(), vec![second_id]);
    }
}
