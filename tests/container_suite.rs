use orgchart_layout::data_source::generate_data_items;
use orgchart_layout::{BoxContainer, BoxId, ChartDataSource, Error, MemoryDataSource};

/// Reports records exactly as listed, duplicates included.
struct ListSource(Vec<(&'static str, Option<&'static str>)>);

impl ChartDataSource for ListSource {
    fn all_data_item_ids(&self) -> Vec<&str> {
        self.0.iter().map(|(id, _)| *id).collect()
    }

    fn parent_key(&self, data_id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(id, _)| *id == data_id)
            .and_then(|(_, parent)| *parent)
    }
}

fn hops_to_root(container: &BoxContainer, start: BoxId) -> Option<usize> {
    let root = container.system_root()?;
    let mut current = start;
    for hops in 0..=container.len() {
        if current == root {
            return Some(hops);
        }
        current = container.get(current)?.visual_parent_id?;
    }
    None
}

#[test]
fn every_record_reaches_the_root() {
    for seed in 0..20 {
        let count = 5 + (seed as usize * 7) % 60;
        let mut source = MemoryDataSource::new();
        generate_data_items(&mut source, count, seed);
        let container = BoxContainer::from_source(&source).unwrap();

        assert_eq!(container.len(), count + 1, "seed {seed}");
        assert_eq!(container.data_bound_len(), count, "seed {seed}");
        for chart_box in container.iter() {
            let hops = hops_to_root(&container, chart_box.id);
            assert!(
                hops.is_some_and(|h| h <= count),
                "seed {seed}: box {} never reaches the root",
                chart_box.id
            );
        }
    }
}

#[test]
fn system_root_gets_the_lowest_id() {
    let mut source = MemoryDataSource::new();
    generate_data_items(&mut source, 25, 3);
    let container = BoxContainer::from_source(&source).unwrap();

    let root = container.system_root().unwrap();
    assert_eq!(root, BoxId(1));
    let root_box = container.get(root).unwrap();
    assert!(root_box.is_special);
    assert_eq!(root_box.data_id, None);
    assert_eq!(root_box.visual_parent_id, None);
    assert_eq!(container.iter().filter(|b| b.is_special).count(), 1);
    assert!(container.iter().all(|b| b.id >= root));
}

#[test]
fn ids_are_dense() {
    let mut source = MemoryDataSource::new();
    generate_data_items(&mut source, 40, 11);
    let container = BoxContainer::from_source(&source).unwrap();
    let ids: Vec<u32> = container.iter().map(|b| b.id.0).collect();
    assert_eq!(ids, (1..=41).collect::<Vec<_>>());
}

#[test]
fn duplicate_keys_fail_without_touching_the_container() {
    let mut container =
        BoxContainer::from_source(&ListSource(vec![("a", None), ("b", Some("a"))])).unwrap();
    let before: Vec<_> = container.iter().cloned().collect();

    let err = container
        .reload(&ListSource(vec![("x", None), ("y", Some("x")), ("x", None)]))
        .unwrap_err();
    assert_eq!(
        err,
        Error::DuplicateDataId {
            data_id: "x".to_string()
        }
    );
    let after: Vec<_> = container.iter().cloned().collect();
    assert_eq!(before, after);
    assert!(container.by_data_id("x").is_none());
    assert!(container.by_data_id("a").is_some());
}

#[test]
fn duplicate_add_box_is_rejected() {
    let mut container = BoxContainer::from_source(&ListSource(vec![("a", None)])).unwrap();
    let root = container.system_root().unwrap();
    let len = container.len();
    assert_eq!(
        container.add_box(Some("a"), root).unwrap_err(),
        Error::DuplicateDataId {
            data_id: "a".to_string()
        }
    );
    assert_eq!(container.len(), len);
}

#[test]
fn add_box_extends_current_generation() {
    let mut container = BoxContainer::from_source(&ListSource(vec![("a", None)])).unwrap();
    let parent = container.by_data_id("a").unwrap().id;
    let id = container.add_box(Some("late"), parent).unwrap();
    assert_eq!(id, BoxId(3));
    let late = container.by_data_id("late").unwrap();
    assert_eq!(late.id, id);
    assert_eq!(late.visual_parent_id, Some(parent));
    assert_eq!(container.get(id).unwrap().data_id.as_deref(), Some("late"));
}

#[test]
fn next_box_id_never_repeats() {
    let mut container = BoxContainer::new();
    let issued: Vec<BoxId> = (0..50).map(|_| container.next_box_id()).collect();
    assert!(issued.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn reload_restarts_the_id_counter() {
    let mut container = BoxContainer::new();
    for _ in 0..10 {
        container.next_box_id();
    }
    container
        .reload(&ListSource(vec![("a", None), ("b", Some("a"))]))
        .unwrap();
    assert_eq!(container.system_root(), Some(BoxId(1)));
    assert_eq!(container.next_box_id(), BoxId(4));

    container.reload(&ListSource(Vec::new())).unwrap();
    assert_eq!(container.len(), 1);
    assert_eq!(container.next_box_id(), BoxId(2));
}

#[test]
fn reload_discards_previous_generation() {
    let mut container = BoxContainer::from_source(&ListSource(vec![("old", None)])).unwrap();
    let root = container.system_root().unwrap();
    container.add_box(Some("extra"), root).unwrap();

    container.reload(&ListSource(vec![("new", None)])).unwrap();
    assert!(container.by_data_id("old").is_none());
    assert!(container.by_data_id("extra").is_none());
    assert_eq!(container.by_data_id("new").unwrap().id, BoxId(2));
    assert_eq!(container.len(), 2);
}
