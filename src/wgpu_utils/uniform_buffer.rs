// src/wgpu_utils/uniform_buffer.rs
//! Dynamic-offset uniform buffer
//!
//! Uniforms in kiln are written by name between draw calls, so one frame
//! needs many snapshots of the same block. [`UniformRing`] collects those
//! snapshots on the CPU, each padded to the device's dynamic offset
//! alignment, and uploads them in one write before the frame is submitted.

/// Growable buffer of equally sized uniform blocks addressed by dynamic offset
pub struct UniformRing {
    buffer: wgpu::Buffer,
    label: String,
    block_size: u64,
    stride: u64,
    capacity: u64,
    staging: Vec<u8>,
}

impl UniformRing {
    /// Creates a ring holding `capacity` blocks of `block_size` bytes.
    pub fn new(device: &wgpu::Device, label: &str, block_size: u64, capacity: u64) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = block_size.div_ceil(alignment) * alignment;
        let capacity = capacity.max(1);

        UniformRing {
            buffer: Self::create_buffer(device, label, stride * capacity),
            label: label.to_string(),
            block_size,
            stride,
            capacity,
            staging: Vec::new(),
        }
    }

    fn create_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("UniformRing: {}", label)),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Appends a snapshot and returns its dynamic offset.
    pub fn push(&mut self, block: &[u8]) -> u32 {
        let offset = self.staging.len();
        self.staging.extend_from_slice(block);
        self.staging.resize(offset + self.stride as usize, 0);
        offset as u32
    }

    fn len(&self) -> u64 {
        self.staging.len() as u64 / self.stride
    }

    /// Drops every snapshot pushed since the last clear.
    pub fn clear(&mut self) {
        self.staging.clear();
    }

    /// Uploads the pending snapshots, growing the GPU buffer first when
    /// needed. Returns `true` if the buffer was recreated, in which case bind
    /// groups referencing it must be rebuilt.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        let needed = self.len();
        let grown = needed > self.capacity;
        if grown {
            self.capacity = needed.next_power_of_two();
            self.buffer = Self::create_buffer(device, &self.label, self.stride * self.capacity);
        }
        if !self.staging.is_empty() {
            queue.write_buffer(&self.buffer, 0, &self.staging);
        }
        grown
    }

    /// Binding covering a single block; pair it with a dynamic offset.
    pub fn binding_resource(&self) -> wgpu::BindingResource {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(self.block_size),
        })
    }
}
