//! GPU elapsed time via timestamp queries
//!
//! A query is a two-slot timestamp set written at the start and end of the
//! main render pass. Ending a query resolves it into a buffer, copies that
//! into a mappable readback buffer and starts an async map; the status check
//! only pumps the device and peeks at the map result.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use stress_metrics::{QueryId, QueryStatus, TimerQueries};

const TIMESTAMP_BYTES: u64 = 2 * std::mem::size_of::<u64>() as u64;

type MapResult = Result<(), wgpu::BufferAsyncError>;

enum SlotState {
    Idle,
    Recording { written: bool },
    Mapping(Receiver<MapResult>),
    Done(QueryStatus),
}

struct QuerySlot {
    id: QueryId,
    query_set: wgpu::QuerySet,
    resolve: wgpu::Buffer,
    readback: wgpu::Buffer,
    state: SlotState,
}

pub struct WgpuTimerQueries {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    period_ns: f64,
    slots: Vec<QuerySlot>,
    next_id: QueryId,
    recording: Option<usize>,
}

/// Nanoseconds between two raw timestamps, or `Disjoint` if they make no sense.
fn elapsed_status(begin: u64, end: u64, period_ns: f64) -> QueryStatus {
    if begin == 0 || end < begin {
        return QueryStatus::Disjoint;
    }
    QueryStatus::Ready {
        nanos: ((end - begin) as f64 * period_ns).round() as u64,
    }
}

impl WgpuTimerQueries {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let period_ns = f64::from(queue.get_timestamp_period());
        tracing::debug!(period_ns, "timestamp queries enabled");
        Self {
            device,
            queue,
            period_ns,
            slots: Vec::new(),
            next_id: 0,
            recording: None,
        }
    }

    fn create_slot(&self, id: QueryId) -> QuerySlot {
        let query_set = self.device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("Frame Timestamps"),
            ty: wgpu::QueryType::Timestamp,
            count: 2,
        });
        let resolve = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Timestamp Resolve Buffer"),
            size: TIMESTAMP_BYTES,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Timestamp Readback Buffer"),
            size: TIMESTAMP_BYTES,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        QuerySlot {
            id,
            query_set,
            resolve,
            readback,
            state: SlotState::Idle,
        }
    }

    fn slot_index(&self, query: QueryId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == query)
    }

    /// Timestamp writes for the pass being recorded, if a query is open.
    pub fn pass_timestamp_writes(&mut self) -> Option<wgpu::RenderPassTimestampWrites<'_>> {
        let slot = self.slots.get_mut(self.recording?)?;
        slot.state = SlotState::Recording { written: true };
        Some(wgpu::RenderPassTimestampWrites {
            query_set: &slot.query_set,
            beginning_of_pass_write_index: Some(0),
            end_of_pass_write_index: Some(1),
        })
    }
}

impl TimerQueries for WgpuTimerQueries {
    fn begin_query(&mut self) -> QueryId {
        self.next_id += 1;
        let id = self.next_id;
        let index = match self
            .slots
            .iter()
            .position(|slot| matches!(slot.state, SlotState::Idle))
        {
            Some(index) => {
                self.slots[index].id = id;
                index
            }
            None => {
                let slot = self.create_slot(id);
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };
        self.slots[index].state = SlotState::Recording { written: false };
        self.recording = Some(index);
        id
    }

    fn end_query(&mut self, query: QueryId) {
        let Some(index) = self.slot_index(query) else {
            return;
        };
        if self.recording == Some(index) {
            self.recording = None;
        }
        let slot = &mut self.slots[index];
        match slot.state {
            SlotState::Recording { written: true } => {}
            SlotState::Recording { written: false } => {
                // The frame was skipped before its pass was encoded.
                slot.state = SlotState::Done(QueryStatus::Disjoint);
                return;
            }
            _ => return,
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Timestamp Resolve Encoder"),
            });
        encoder.resolve_query_set(&slot.query_set, 0..2, &slot.resolve, 0);
        encoder.copy_buffer_to_buffer(&slot.resolve, 0, &slot.readback, 0, TIMESTAMP_BYTES);
        self.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = mpsc::channel();
        slot.readback
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
        slot.state = SlotState::Mapping(rx);
    }

    fn query_status(&mut self, query: QueryId) -> QueryStatus {
        let Some(index) = self.slot_index(query) else {
            return QueryStatus::Disjoint;
        };
        if matches!(self.slots[index].state, SlotState::Mapping(_)) {
            // Push GPU work forward without waiting on it.
            let _ = self.device.poll(wgpu::Maintain::Poll);
        }

        let period_ns = self.period_ns;
        let slot = &mut self.slots[index];
        let status = match &slot.state {
            SlotState::Idle | SlotState::Recording { .. } => return QueryStatus::Pending,
            SlotState::Done(status) => return *status,
            SlotState::Mapping(rx) => match rx.try_recv() {
                Err(TryRecvError::Empty) => return QueryStatus::Pending,
                Err(TryRecvError::Disconnected) | Ok(Err(_)) => QueryStatus::Disjoint,
                Ok(Ok(())) => {
                    let status = {
                        let data = slot.readback.slice(..).get_mapped_range();
                        let begin: u64 = bytemuck::pod_read_unaligned(&data[0..8]);
                        let end: u64 = bytemuck::pod_read_unaligned(&data[8..16]);
                        elapsed_status(begin, end, period_ns)
                    };
                    slot.readback.unmap();
                    status
                }
            },
        };
        slot.state = SlotState::Done(status);
        status
    }

    fn delete_query(&mut self, query: QueryId) {
        let Some(index) = self.slot_index(query) else {
            return;
        };
        if self.recording == Some(index) {
            self.recording = None;
        }
        // A pending map cannot be reused; dropping the buffers cancels it.
        if matches!(self.slots[index].state, SlotState::Mapping(_)) {
            self.slots.swap_remove(index);
            if self.recording == Some(self.slots.len()) {
                self.recording = Some(index);
            }
        } else {
            self.slots[index].state = SlotState::Idle;
        }
    }
}
