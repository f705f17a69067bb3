use std::collections::{BTreeMap, HashMap, HashSet};

use crate::chart_box::{BoxId, ChartBox};
use crate::data_source::ChartDataSource;
use crate::error::{Error, Result};

/// Owns the boxes of one chart generation and defines the scope in which
/// their identifiers are unique.
#[derive(Debug, Clone, Default)]
pub struct BoxContainer {
    last_box_id: u32,
    boxes_by_id: BTreeMap<BoxId, ChartBox>,
    boxes_by_data_id: HashMap<String, BoxId>,
    system_root: Option<BoxId>,
}

impl BoxContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_source(source: &dyn ChartDataSource) -> Result<Self> {
        Self::build(source)
    }

    /// Replaces every box with a fresh generation built from `source`.
    ///
    /// On error the current generation is left untouched.
    pub fn reload(&mut self, source: &dyn ChartDataSource) -> Result<()> {
        *self = Self::build(source)?;
        Ok(())
    }

    fn build(source: &dyn ChartDataSource) -> Result<Self> {
        let mut staged = Self::new();

        // the root takes the lowest id but joins the index only once every
        // data-bound box is in place
        let root = ChartBox::special(staged.next_box_id());

        // records arrive in any order, so every key needs an id before any
        // parent can be resolved
        let data_ids = source.all_data_item_ids();
        let mut map: HashMap<&str, BoxId> = HashMap::with_capacity(data_ids.len());
        for &data_id in &data_ids {
            if map.contains_key(data_id) {
                return Err(Error::DuplicateDataId {
                    data_id: data_id.to_string(),
                });
            }
            let id = staged.next_box_id();
            map.insert(data_id, id);
        }

        for &data_id in &data_ids {
            let parent_key = if data_id.is_empty() {
                None
            } else {
                source.parent_key(data_id).filter(|key| !key.is_empty())
            };
            let visual_parent_id = match parent_key {
                None => root.id,
                Some(parent_key) => {
                    *map.get(parent_key).ok_or_else(|| Error::UnknownParent {
                        data_id: data_id.to_string(),
                        parent_id: parent_key.to_string(),
                    })?
                }
            };
            let bound = (!data_id.is_empty()).then(|| data_id.to_string());
            staged.insert(ChartBox::new(map[data_id], bound, visual_parent_id));
        }

        staged.system_root = Some(root.id);
        staged.boxes_by_id.insert(root.id, root);
        staged.ensure_rooted()?;

        tracing::debug!(
            boxes = staged.boxes_by_id.len(),
            last_box_id = staged.last_box_id,
            "built box container generation"
        );
        Ok(staged)
    }

    /// Every box must reach the system root by following parent links.
    fn ensure_rooted(&self) -> Result<()> {
        let Some(root) = self.system_root else {
            return Ok(());
        };
        let mut rooted: HashSet<BoxId> = HashSet::with_capacity(self.boxes_by_id.len());
        rooted.insert(root);
        for &start in self.boxes_by_id.keys() {
            let mut path = Vec::new();
            let mut current = start;
            while !rooted.contains(&current) {
                if path.len() > self.boxes_by_id.len() {
                    return Err(self.cycle_error(start));
                }
                path.push(current);
                match self.boxes_by_id[&current].visual_parent_id {
                    Some(parent) if self.boxes_by_id.contains_key(&parent) => current = parent,
                    _ => return Err(self.cycle_error(start)),
                }
            }
            rooted.extend(path);
        }
        Ok(())
    }

    fn cycle_error(&self, id: BoxId) -> Error {
        Error::Cycle {
            data_id: self.boxes_by_id[&id].data_id.clone().unwrap_or_default(),
        }
    }

    /// Creates one box outside of a reload and registers it in both indices.
    pub fn add_box(&mut self, data_id: Option<&str>, visual_parent_id: BoxId) -> Result<BoxId> {
        if !self.boxes_by_id.contains_key(&visual_parent_id) {
            return Err(Error::UnknownBox(visual_parent_id));
        }
        let data_id = data_id.filter(|id| !id.is_empty());
        if let Some(data_id) = data_id
            && self.boxes_by_data_id.contains_key(data_id)
        {
            return Err(Error::DuplicateDataId {
                data_id: data_id.to_string(),
            });
        }
        let id = self.next_box_id();
        self.insert(ChartBox::new(
            id,
            data_id.map(str::to_string),
            visual_parent_id,
        ));
        Ok(id)
    }

    /// Issues a fresh identifier. Never repeats within one generation.
    pub fn next_box_id(&mut self) -> BoxId {
        self.last_box_id += 1;
        BoxId(self.last_box_id)
    }

    fn insert(&mut self, chart_box: ChartBox) {
        if let Some(data_id) = &chart_box.data_id {
            self.boxes_by_data_id.insert(data_id.clone(), chart_box.id);
        }
        self.boxes_by_id.insert(chart_box.id, chart_box);
    }

    pub fn system_root(&self) -> Option<BoxId> {
        self.system_root
    }

    pub fn get(&self, id: BoxId) -> Option<&ChartBox> {
        self.boxes_by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: BoxId) -> Option<&mut ChartBox> {
        self.boxes_by_id.get_mut(&id)
    }

    pub fn by_data_id(&self, data_id: &str) -> Option<&ChartBox> {
        self.boxes_by_data_id
            .get(data_id)
            .and_then(|id| self.boxes_by_id.get(id))
    }

    pub fn by_data_id_mut(&mut self, data_id: &str) -> Option<&mut ChartBox> {
        let id = *self.boxes_by_data_id.get(data_id)?;
        self.boxes_by_id.get_mut(&id)
    }

    /// All boxes, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &ChartBox> {
        self.boxes_by_id.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChartBox> {
        self.boxes_by_id.values_mut()
    }

    /// Direct children of `id`, ordered by id.
    pub fn children_of(&self, id: BoxId) -> Vec<BoxId> {
        self.boxes_by_id
            .values()
            .filter(|b| b.visual_parent_id == Some(id))
            .map(|b| b.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.boxes_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes_by_id.is_empty()
    }

    pub fn data_bound_len(&self) -> usize {
        self.boxes_by_data_id.len()
    }
}
