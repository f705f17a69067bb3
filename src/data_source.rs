//! Data sources feeding [`BoxContainer`](crate::container::BoxContainer),
//! plus a seeded generator of random hierarchies for demos and benchmarks.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::geometry::Size;

/// Flat record set describing a hierarchy.
///
/// The empty string is reserved to mean "no item" and never names a record.
pub trait ChartDataSource {
    /// Every record key, in any order. Children may precede their parents.
    fn all_data_item_ids(&self) -> Vec<&str>;

    /// Key of the parent record; `None` or `""` places the record under the
    /// synthetic root.
    fn parent_key(&self, data_id: &str) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataItem {
    pub parent_id: Option<String>,
    pub label: String,
}

/// In-memory data source. Keys are reported in insertion order.
///
/// Records sharing a key are all reported, so a container built from them
/// fails with [`Error::DuplicateDataId`](crate::error::Error::DuplicateDataId).
/// Lookups by key see the first record.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSource {
    order: Vec<String>,
    items: HashMap<String, DataItem>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Returns `false` if the key was already taken.
    pub fn insert(&mut self, data_id: impl Into<String>, item: DataItem) -> bool {
        let data_id = data_id.into();
        self.order.push(data_id.clone());
        match self.items.entry(data_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(item);
                true
            }
        }
    }

    pub fn add(&mut self, data_id: &str, parent_id: Option<&str>) -> bool {
        self.insert(
            data_id,
            DataItem {
                parent_id: parent_id.map(str::to_string),
                label: data_id.to_string(),
            },
        )
    }

    pub fn get(&self, data_id: &str) -> Option<&DataItem> {
        self.items.get(data_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn shuffle(&mut self, rng: &mut StdRng) {
        self.order.shuffle(rng);
    }
}

impl ChartDataSource for MemoryDataSource {
    fn all_data_item_ids(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    fn parent_key(&self, data_id: &str) -> Option<&str> {
        self.items
            .get(data_id)
            .and_then(|item| item.parent_id.as_deref())
    }
}

/// Fills `source` with `count` records forming a random hierarchy.
///
/// Roughly one record in ten is top-level; the rest pick an earlier record
/// as parent. Keys are shuffled afterwards so children often precede parents.
pub fn generate_data_items(source: &mut MemoryDataSource, count: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = source.len();
    for i in 0..count {
        let data_id = format!("{}", base + i + 1);
        let parent = if i == 0 || rng.random_range(0..10) == 0 {
            None
        } else {
            let parent_index = rng.random_range(0..i);
            Some(format!("{}", base + parent_index + 1))
        };
        source.insert(
            data_id.clone(),
            DataItem {
                parent_id: parent,
                label: format!("Item {data_id}"),
            },
        );
    }
    source.shuffle(&mut rng);
}

/// Random box sizes for every record of `source`.
pub fn generate_box_sizes(source: &MemoryDataSource, seed: u64) -> BTreeMap<String, Size> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ids = source.all_data_item_ids();
    ids.sort_unstable();
    ids.into_iter()
        .map(|id| {
            let width = rng.random_range(50..=110) as f32;
            let height = rng.random_range(40..=60) as f32;
            (id.to_string(), Size::new(width, height))
        })
        .collect()
}
