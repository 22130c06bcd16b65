//! 页码与页对齐
//!
//! - [`Ppn`] - 物理页码
//! - [`Vpn`] - 虚拟页码

use crate::config::{PAGE_SHIFT, PAGE_SIZE};

/// 向上对齐到页边界
#[inline]
pub const fn page_round_up(addr: usize) -> usize {
    (addr + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// 向下对齐到页边界
#[inline]
pub const fn page_round_down(addr: usize) -> usize {
    addr & !(PAGE_SIZE - 1)
}

/// 是否页对齐
#[inline]
pub const fn is_page_aligned(addr: usize) -> bool {
    addr & (PAGE_SIZE - 1) == 0
}

/// `impl_page_num!` 宏
/// ---------------------
/// 为页码类型实现地址与页码之间的换算。
macro_rules! impl_page_num {
    ($name:ident) => {
        impl $name {
            /// 包含 `addr` 的页
            #[inline]
            pub const fn from_addr_floor(addr: usize) -> Self {
                Self(addr >> PAGE_SHIFT)
            }

            /// `addr` 所在页，未对齐时取下一页
            #[inline]
            pub const fn from_addr_ceil(addr: usize) -> Self {
                Self(page_round_up(addr) >> PAGE_SHIFT)
            }

            /// 页的起始地址
            #[inline]
            pub const fn start_addr(self) -> usize {
                self.0 << PAGE_SHIFT
            }

            /// 页码数值
            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0
            }

            /// 之后第 `n` 页
            #[inline]
            pub const fn add(self, n: usize) -> Self {
                Self(self.0 + n)
            }
        }
    };
}

/// 物理页码
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Ppn(pub usize);

/// 虚拟页码
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Vpn(pub usize);

impl_page_num!(Ppn);
impl_page_num!(Vpn);
