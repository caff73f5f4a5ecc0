//! 作用域连接
//!
//! 获取时连接，析构时关闭。

use crate::{Transport, TransportError};
use std::ops::{Deref, DerefMut};
use tracing::warn;

/// 持有已连接链路的守卫，Drop 时关闭链路。
pub struct ConnectionGuard<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
}

impl<'a, T: Transport + ?Sized> ConnectionGuard<'a, T> {
    /// 连接并返回守卫；连接失败时不持有链路。
    pub async fn acquire(transport: &'a mut T) -> Result<Self, TransportError> {
        transport.connect().await?;
        Ok(Self { transport })
    }
}

impl<T: Transport + ?Sized> Deref for ConnectionGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport + ?Sized> DerefMut for ConnectionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport + ?Sized> Drop for ConnectionGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.close() {
            warn!(error = %e, "failed to close transport");
        }
    }
}
