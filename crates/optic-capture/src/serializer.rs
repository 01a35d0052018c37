use std::collections::HashSet;

use bytes::Bytes;
use optic_memory::{Observation, PoolId};
use optic_runtime::{self as runtime, Context, Result, Slice};

use crate::encoder::CallObserver;

/// Tunables for state serialization.
#[derive(Clone, Copy, Debug)]
pub struct SerializerOptions {
    /// Observations up to this many bytes carry their payload inline;
    /// larger ones go through the resource stream and are encoded as
    /// `{size, res_index}` references.
    pub max_inline_observation: usize,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            max_inline_observation: 64 * 1024,
        }
    }
}

/// Emits the initial memory observations of a state capture.
///
/// Over a single [`StateSerializer::prepare_for_state`], each
/// non-application pool is observed at most once, and always before any
/// later reference to it in the encoded stream.
pub struct StateSerializer<'o> {
    observer: &'o mut CallObserver,
    options: SerializerOptions,
    seen: HashSet<PoolId>,
    empty_res_index: Option<i64>,
}

impl<'o> StateSerializer<'o> {
    pub fn new(observer: &'o mut CallObserver, options: SerializerOptions) -> Self {
        Self {
            observer,
            options,
            seen: HashSet::new(),
            empty_res_index: None,
        }
    }

    /// Begins a fresh global state on the encoder and runs `serialize`,
    /// observing every slice it emits through
    /// [`StateSerializer::encode_slice`].
    pub fn prepare_for_state<T, F>(&mut self, ctx: &mut Context, serialize: F) -> Result<T>
    where
        F: FnOnce(&mut StateSerializer<'_>, &mut Context) -> Result<T>,
    {
        self.observer.encoder_mut().begin_global_state();
        self.seen.clear();
        serialize(self, ctx)
    }

    /// Encodes `slice`, emitting the backing pool's initial observation the
    /// first time the pool is referenced in this serialization.
    pub fn encode_slice(&mut self, ctx: &mut Context, slice: &Slice) -> Result<()> {
        self.observer.encoder_mut().encode_slice(slice);
        if !slice.is_app_pool() && self.seen.insert(slice.pool) {
            let size = ctx.env().pool_size(slice.pool);
            let bytes = runtime::read_pool_data(ctx, slice.pool, 0, size)?.into_bytes();
            self.emit_observation(slice.pool, bytes);
        }
        Ok(())
    }

    /// Creates a pool and emits its initial observation: `init` fills it in
    /// when provided, otherwise the empty-resource sentinel (sent to the
    /// resource stream once per serializer and reused).
    pub fn create_pool(
        &mut self,
        ctx: &mut Context,
        size: u64,
        init: Option<&dyn Fn(&mut Observation)>,
    ) -> Result<PoolId> {
        let pool = runtime::make_pool(ctx, size)?;
        self.seen.insert(pool);

        let observation = match init {
            Some(init) => {
                let mut observation = Observation::inline(pool, 0, Bytes::new());
                init(&mut observation);
                observation
            }
            None => {
                let res_index = match self.empty_res_index {
                    Some(index) => index,
                    None => {
                        let index = self.observer.encoder_mut().send_resource(&[]);
                        self.empty_res_index = Some(index);
                        index
                    }
                };
                Observation::resource(pool, 0, 0, res_index)
            }
        };
        self.observer.encoder_mut().encode_observation(&observation);
        Ok(pool)
    }

    fn emit_observation(&mut self, pool: PoolId, bytes: Bytes) {
        let observation = if bytes.len() <= self.options.max_inline_observation {
            Observation::inline(pool, 0, bytes)
        } else {
            let res_index = self.observer.encoder_mut().send_resource(&bytes);
            Observation::resource(pool, 0, bytes.len() as u64, res_index)
        };
        self.observer.encoder_mut().encode_observation(&observation);
    }
}
