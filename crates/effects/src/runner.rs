//! Sequential effect chain execution.

use crate::effect::{Effect, EffectParams};
use crate::plugin::EffectContext;
use crate::registry::EffectRegistry;
use common::error::{CompositorError, CompositorResult};
use render::{AlphaMode, Surface};
use std::collections::HashSet;
use std::sync::Arc;

/// Runs effect chains using two reusable surfaces.
pub struct EffectRunner {
    registry: Arc<EffectRegistry>,
    buffers: [Surface; 2],
    /// Identifiers already reported as missing.
    warned: HashSet<String>,
}

impl EffectRunner {
    pub fn new(registry: Arc<EffectRegistry>, width: u32, height: u32) -> Self {
        Self {
            registry,
            buffers: [Surface::premultiplied(width, height), Surface::premultiplied(width, height)],
            warned: HashSet::new(),
        }
    }

    pub fn registry(&self) -> &Arc<EffectRegistry> {
        &self.registry
    }

    /// Recreate the working surfaces when the frame size changes.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.buffers[0].size() != (width, height) {
            tracing::debug!(width, height, "Resizing effect buffers");
            for buffer in &mut self.buffers {
                buffer.resize(width, height);
            }
        }
    }

    /// Run every enabled effect over `input` in order.
    ///
    /// `params[i]` holds the evaluated parameters of `effects[i]`; missing
    /// entries read as empty. The returned surface is valid until the next
    /// call.
    pub fn run(
        &mut self,
        input: &Surface,
        effects: &[Effect],
        params: &[EffectParams],
        time: f64,
    ) -> CompositorResult<&Surface> {
        input.require_alpha(AlphaMode::Premultiplied)?;
        self.resize(input.width(), input.height());
        self.buffers[0].copy_from(input)?;

        let empty = EffectParams::default();
        let mut read = 0;
        for (index, effect) in effects.iter().enumerate() {
            if !effect.enabled {
                continue;
            }
            let Some(plugin) = self.registry.get(&effect.identifier) else {
                if self.warned.insert(effect.identifier.clone()) {
                    tracing::warn!(effect = %effect.identifier, "Unknown effect, passing through");
                }
                continue;
            };

            let ctx = EffectContext {
                time,
                params: params.get(index).unwrap_or(&empty),
            };
            let (first, second) = self.buffers.split_at_mut(1);
            let (src, dst) = if read == 0 {
                (&first[0], &mut second[0])
            } else {
                (&second[0], &mut first[0])
            };
            plugin.apply(&ctx, src, dst).map_err(|e| {
                CompositorError::render(format!("effect {} failed: {}", effect.identifier, e))
            })?;
            read = 1 - read;
        }
        Ok(&self.buffers[read])
    }

    /// Evaluate each effect's parameters at `time` and run the chain.
    pub fn run_at(&mut self, input: &Surface, effects: &[Effect], time: f64) -> CompositorResult<&Surface> {
        let params: Vec<EffectParams> = effects.iter().map(|e| e.evaluate(time)).collect();
        self.run(input, effects, &params, time)
    }

    /// Whether `identifier` has been reported missing.
    pub fn has_warned(&self, identifier: &str) -> bool {
        self.warned.contains(identifier)
    }
}
