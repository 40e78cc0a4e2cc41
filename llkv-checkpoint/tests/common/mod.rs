#![allow(dead_code)]

use std::sync::Arc;

use llkv_checkpoint::{
    ColumnCheckpointState, ColumnSegment, CompressionKind, CompressionRegistry, PartialBlockConfig,
    PartialBlockManager, SegmentStatistics,
};
use llkv_storage::{
    BatchGet, BufferManager, GetResult, InstrumentedPager, IoStats, MemPager, Pager, PhysicalKey,
};
use llkv_types::{PhysicalType, Vector};

pub const BLOCK: usize = 4096;

pub type TestPager = InstrumentedPager<MemPager>;

pub struct Fixture {
    pub buffers: Arc<BufferManager>,
    pub pager: Arc<TestPager>,
    pub stats: Arc<IoStats>,
    pub manager: PartialBlockManager<TestPager>,
    pub registry: CompressionRegistry,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(PartialBlockConfig::with_block_size(BLOCK))
    }

    pub fn with_config(config: PartialBlockConfig) -> Self {
        let (pager, stats) = InstrumentedPager::new(MemPager::new());
        let pager = Arc::new(pager);
        let buffers = Arc::new(BufferManager::new());
        let manager =
            PartialBlockManager::new(Arc::clone(&pager), Arc::clone(&buffers), config).unwrap();
        Self {
            buffers,
            pager,
            stats,
            manager,
            registry: CompressionRegistry::with_defaults(),
        }
    }

    /// An `Int64` segment over `values` whose payload is `size` bytes of `fill`.
    pub fn segment(&self, values: &[Option<i64>], size: usize, fill: u8) -> ColumnSegment {
        segment_of(
            &self.buffers,
            &self.registry,
            &Vector::from_options(values.iter().copied()),
            size,
            fill,
        )
    }

    /// Flush a [`segment`](Self::segment) of `size` bytes through `col`.
    pub fn flush(
        &self,
        col: &mut ColumnCheckpointState<'_, TestPager>,
        values: &[Option<i64>],
        size: usize,
        fill: u8,
    ) {
        col.flush_segment(self.segment(values, size, fill), size)
            .unwrap();
    }

    pub fn block_bytes(&self, block_id: PhysicalKey) -> Arc<[u8]> {
        read_block(self.pager.inner(), block_id)
    }
}

pub fn segment_of(
    buffers: &BufferManager,
    registry: &CompressionRegistry,
    values: &Vector,
    size: usize,
    fill: u8,
) -> ColumnSegment {
    let function = registry
        .get(CompressionKind::Uncompressed, values.physical_type())
        .unwrap();
    ColumnSegment::from_bytes(
        buffers,
        values.len() as u64,
        SegmentStatistics::from_vector(values),
        function,
        &vec![fill; size],
    )
    .unwrap()
}

/// `n` distinct values starting at `base`.
pub fn distinct(base: i64, n: usize) -> Vec<Option<i64>> {
    (0..n as i64).map(|i| Some(base + i)).collect()
}

pub fn read_block(pager: &MemPager, block_id: PhysicalKey) -> Arc<[u8]> {
    match pager
        .batch_get(&[BatchGet::Raw { key: block_id }])
        .unwrap()
        .remove(0)
    {
        GetResult::Raw { bytes, .. } => bytes,
        GetResult::Missing { key } => panic!("block {key} was never written"),
    }
}

pub fn int64() -> PhysicalType {
    PhysicalType::Int64
}
