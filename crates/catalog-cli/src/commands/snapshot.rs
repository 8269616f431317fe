use std::path::Path;

use anyhow::Context;
use catalog_fsm::{SnapshotData, StateMachine};
use catalog_state::StateStore;

pub fn save(store: StateStore, path: &Path) -> anyhow::Result<()> {
    let sm = StateMachine::new(store)?;
    let data = sm.build_snapshot()?;
    std::fs::write(path, data.to_bytes()?)
        .with_context(|| format!("writing {}", path.display()))?;
    println!(
        "✓ Saved snapshot at index {} ({} nodes, {} coordinates)",
        data.last_index,
        data.nodes.len(),
        data.coordinates.len()
    );
    println!("  Output: {}", path.display());
    Ok(())
}

pub fn restore(store: StateStore, path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let data = SnapshotData::from_bytes(&bytes)?;
    let mut sm = StateMachine::new(store)?;
    sm.install_snapshot(&data)?;
    let (_, rows) = sm.store().coordinates(None, None)?;
    println!(
        "✓ Restored snapshot at index {} ({} of {} coordinates kept)",
        data.last_index,
        rows.len(),
        data.coordinates.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_state::{Coordinate, CoordinateEntry, Node};

    #[test]
    fn save_then_restore_into_another_store() {
        let dir = tempfile::tempdir().unwrap();
        let snap_path = dir.path().join("catalog.snap");

        let source = StateStore::open_in_memory().unwrap();
        source.ensure_node(1, &Node::new("web-1", "10.1.0.4")).unwrap();
        source
            .coordinate_batch_update(2, &[CoordinateEntry::new("web-1", "", Coordinate::new(3))])
            .unwrap();
        save(source.clone(), &snap_path).unwrap();

        let target = StateStore::open_in_memory().unwrap();
        restore(target.clone(), &snap_path).unwrap();

        assert_eq!(
            target.coordinates(None, None).unwrap(),
            source.coordinates(None, None).unwrap()
        );
    }
}
