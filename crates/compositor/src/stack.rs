//! Per-frame stack planning.
//!
//! Turns the layer list into an ordered list of render units for one time:
//! 1. select layers active at the time
//! 2. pair track-matte consumers with their matte sources
//! 3. group consecutive 3D layers
//!
//! Units refer to layers by index into [`Composition::layers`].

use crate::composition::Composition;
use crate::layer::{Layer, LayerId, TrackMatte};
use std::collections::{HashMap, HashSet};

/// Where a layer's track matte comes from this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatteSource {
    /// A layer inside its time range, by index. Disabled layers still
    /// serve as mattes.
    Layer(usize),
    /// The target exists but is outside its time range; it covers nothing.
    Empty,
}

/// A layer scheduled for rendering together with its matte, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedLayer {
    pub index: usize,
    pub matte: Option<MatteSource>,
}

/// One step of bottom-to-top compositing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderUnit {
    /// A 2D layer.
    Layer(PlannedLayer),
    /// A run of consecutive 3D layers sharing a depth-resolved surface.
    Group(Vec<PlannedLayer>),
}

impl RenderUnit {
    pub fn layers(&self) -> &[PlannedLayer] {
        match self {
            RenderUnit::Layer(layer) => std::slice::from_ref(layer),
            RenderUnit::Group(layers) => layers,
        }
    }
}

/// Render plan for one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackPlan {
    pub units: Vec<RenderUnit>,
    /// Indices of layers used only as matte sources.
    pub consumed: Vec<usize>,
}

impl StackPlan {
    /// Total number of layers that will be drawn.
    pub fn layer_count(&self) -> usize {
        self.units.iter().map(|u| u.layers().len()).sum()
    }
}

/// Layer indices in stack order: ascending `z_order`, ties by list position.
pub fn stack_order(layers: &[Layer]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..layers.len()).collect();
    order.sort_by_key(|&i| layers[i].z_order);
    order
}

/// Build the render plan for `comp` at `time`.
pub fn plan(comp: &Composition, time: f64) -> StackPlan {
    let active: Vec<usize> = stack_order(&comp.layers)
        .into_iter()
        .filter(|&i| comp.layers[i].is_active_at(time))
        .collect();

    let mut active_by_id: HashMap<LayerId, usize> = HashMap::with_capacity(active.len());
    for &i in &active {
        active_by_id.entry(comp.layers[i].id).or_insert(i);
    }

    let mut all_by_id: HashMap<LayerId, usize> = HashMap::with_capacity(comp.layers.len());
    for (i, layer) in comp.layers.iter().enumerate() {
        all_by_id.entry(layer.id).or_insert(i);
    }

    let mut mattes: HashMap<usize, MatteSource> = HashMap::new();
    let mut consumed: HashSet<usize> = HashSet::new();
    for &i in &active {
        let layer = &comp.layers[i];
        let Some(TrackMatte { target, .. }) = &layer.track_matte else {
            continue;
        };
        if *target == layer.id {
            tracing::warn!(layer = %layer.label(), "Layer uses itself as track matte; ignoring");
            continue;
        }
        match active_by_id.get(target) {
            Some(&source) => {
                mattes.insert(i, MatteSource::Layer(source));
                consumed.insert(source);
            }
            None => match all_by_id.get(target) {
                Some(&source) if comp.layers[source].in_range_at(time) => {
                    mattes.insert(i, MatteSource::Layer(source));
                }
                Some(_) => {
                    mattes.insert(i, MatteSource::Empty);
                }
                None => {
                    tracing::warn!(
                        layer = %layer.label(),
                        target = %target,
                        "Track matte target not found; rendering unmatted"
                    );
                }
            },
        }
    }

    let mut units = Vec::new();
    let mut group: Vec<PlannedLayer> = Vec::new();
    for &i in &active {
        if consumed.contains(&i) {
            continue;
        }
        let planned = PlannedLayer {
            index: i,
            matte: mattes.get(&i).copied(),
        };
        if comp.layers[i].is_3d {
            group.push(planned);
            continue;
        }
        if !group.is_empty() {
            units.push(RenderUnit::Group(std::mem::take(&mut group)));
        }
        units.push(RenderUnit::Layer(planned));
    }
    if !group.is_empty() {
        units.push(RenderUnit::Group(group));
    }

    let mut consumed: Vec<usize> = consumed.into_iter().collect();
    consumed.sort_unstable();
    StackPlan { units, consumed }
}
