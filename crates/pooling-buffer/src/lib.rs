//! `pooling-buffer` 提供 [`BufferPool`](pooling_core::BufferPool) 契约的默认实现。
//!
//! # 模块定位（Why）
//! - 为 `pooling-core` 的租借/归还契约落地一个基于 `bytes::BytesMut` 的自由链表池，
//!   让出站内容在编码时复用已有容量，而不是每次向分配器申请新数组；
//! - 通过 [`shared_pool`] 暴露进程级共享实例，调用方无需自行管理池的生命周期。
//!
//! # 设计概要（How）
//! - `pool` 模块实现 [`SlabBufferPool`]：`spin::Mutex<Vec<BytesMut>>` 作为自由链表，
//!   原子计数维护统计快照；
//! - 池不追踪单个缓冲的身份，“恰好归还一次”由持有方的状态机保证。

mod pool;

pub use pool::{SlabBufferPool, shared_pool};
