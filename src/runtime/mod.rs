//! Execution substrates that actually run started units.
//!
//! Each substrate implements [`Spawn`](crate::core::Spawn). The scheduler only
//! provides admission control; where and how a started unit runs is decided here.

#[cfg(not(target_arch = "wasm32"))]
pub mod thread_pool;
#[cfg(not(target_arch = "wasm32"))]
pub mod thread_spawner;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

#[cfg(not(target_arch = "wasm32"))]
pub use thread_pool::ThreadPoolSpawner;
#[cfg(not(target_arch = "wasm32"))]
pub use thread_spawner::ThreadSpawner;
#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;
