//! Device contract and test utilities for Strata.
//!
//! The batcher never talks to wgpu directly. It consumes the [`RenderContext`] trait,
//! which hands out owned GPU wrapper types that are either real wgpu objects or mocks.
//!
//! - [`RenderContext`] - Trait abstracting the GPU operations the batcher needs
//! - `MockRenderContext` - Recording implementation for tests (requires `mock` feature)
//! - GPU wrapper types ([`GpuBuffer`], [`GpuTexture`], [`GpuSampler`],
//!   [`GpuBindGroupLayout`], [`GpuDescriptorSet`])
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use strata_test_utils::{MockRenderContext, RenderContext};
//! use wgpu::*;
//!
//! let mock = MockRenderContext::new();
//!
//! let buffer = mock.create_buffer(&BufferDescriptor {
//!     label: Some("test_buffer"),
//!     size: 1024,
//!     usage: BufferUsages::VERTEX,
//!     mapped_at_creation: false,
//! });
//!
//! assert_eq!(mock.count_buffer_creates(), 1);
//! assert!(buffer.is_mock());
//! # }
//! ```
//!
//! All wrapper types are owned and cheap to clone, so no lifetime parameters leak into
//! the batcher. Mock implementations use `Mutex` for interior mutability, allowing `&self`
//! methods to record calls, and `RenderContext` stays object-safe (`dyn RenderContext`).

pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
