use std::borrow::Cow;

use bytes::BytesMut;

use crate::CoreError;

/// `BufferPool` 规定字节缓冲租借与归还的统一接口。
///
/// # 设计背景（Why）
/// - 出站负载（例如文本内容编码结果）生命周期短、尺寸分散，逐次堆分配会放大分配器压力；
///   通过共享池复用 `BytesMut`，让编码路径只在池未命中时才向系统申请内存。
/// - 租借与归还被拆成两个显式调用，由持有方（例如 `pooling-http::BufferLease`）
///   自行保证“恰好归还一次”，池侧不追踪单个缓冲的身份。
///
/// # 契约说明（What）
/// - `rent(min_capacity)`：返回 `capacity() >= min_capacity` 的缓冲，`len()` 为 0；
///   可写区域内容未定义（可能残留上一位租借者的数据），调用方不得假设其被清零。
/// - `return_buffer(buffer)`：把所有权交还池；调用方此后不得再访问该缓冲。
///   必须接受仅部分写入的缓冲（编码失败路径）。
/// - `shrink_to_fit`：释放池内闲置容量，返回回收的字节数。
/// - `statistics`：返回调用瞬间的 [`PoolStats`] 快照。
/// - **线程安全**：实现必须允许无关调用方并发 `rent` / `return_buffer`。
///
/// # 设计取舍（Trade-offs）
/// - `BytesMut` 按值移动，同一缓冲在类型层面不可能被归还两次；
///   “至多一次”的运行时保障只需落在持有方的状态机上。
pub trait BufferPool: Send + Sync + 'static {
    /// 租借一个容量不小于 `min_capacity` 的缓冲。
    fn rent(&self, min_capacity: usize) -> Result<BytesMut, CoreError>;

    /// 归还先前租借的缓冲。
    fn return_buffer(&self, buffer: BytesMut) -> Result<(), CoreError>;

    /// 主动收缩池内冗余内存，返回实际回收的字节数。
    fn shrink_to_fit(&self) -> Result<usize, CoreError>;

    /// 返回池当前的核心统计指标。
    fn statistics(&self) -> Result<PoolStats, CoreError>;
}

/// 池统计快照。
///
/// # 契约说明（What）
/// - `allocated_bytes`：池向系统申请且仍由池负责的总字节数（含借出与闲置）；
/// - `active_leases`：尚未归还的租借数量；
/// - `available_bytes`：闲置于自由链表、无需再分配即可借出的容量；
/// - `failed_acquisitions`：累计租借失败次数；
/// - `custom_dimensions`：实现自定义指标，键使用稳定的 `snake_case`。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub allocated_bytes: usize,
    pub active_leases: usize,
    pub available_bytes: usize,
    pub failed_acquisitions: u64,
    pub custom_dimensions: Vec<PoolStatDimension>,
}

impl PoolStats {
    /// 按键查找自定义维度，未登记时返回 `None`。
    pub fn dimension(&self, key: &str) -> Option<usize> {
        self.custom_dimensions
            .iter()
            .find(|dim| dim.key == key)
            .map(|dim| dim.value)
    }
}

/// 扩展指标维度，用于承载实现者的定制数据。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolStatDimension {
    pub key: Cow<'static, str>,
    pub value: usize,
}
