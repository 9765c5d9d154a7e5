//! 最新直播间快照
//!
//! 单写多读的交接槽：发现任务每轮写入一次，其他协作者只读。
//! 读者看到的可能是上一轮的快照，这是允许的。

use std::sync::Arc;
use tokio::sync::watch;

/// 一轮发现任务拉取到的直播间号
pub type Rooms = Arc<Vec<i64>>;

/// 快照写入端，由发现任务持有
#[derive(Debug)]
pub struct LiveSnapshot {
    tx: watch::Sender<Rooms>,
}

impl LiveSnapshot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Rooms::default());
        Self { tx }
    }

    /// 替换当前快照
    pub fn publish(&self, rooms: Vec<i64>) {
        self.tx.send_replace(Arc::new(rooms));
    }

    /// 创建只读句柄
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for LiveSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// 快照只读句柄
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Rooms>,
}

impl SnapshotReader {
    /// 当前快照
    pub fn current(&self) -> Rooms {
        self.rx.borrow().clone()
    }

    /// 直播间是否正在直播（以最近一次快照为准）
    pub fn is_live(&self, room_id: i64) -> bool {
        self.rx.borrow().contains(&room_id)
    }

    /// 当前正在监听的直播间数量
    pub fn len(&self) -> usize {
        self.rx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 等待下一次快照更新；写入端已释放时返回 `false`
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_sees_latest_publish() {
        let snapshot = LiveSnapshot::new();
        let reader = snapshot.reader();
        assert!(reader.is_empty());

        snapshot.publish(vec![10, 11]);
        assert!(reader.is_live(10));
        assert!(!reader.is_live(12));

        snapshot.publish(vec![12]);
        assert_eq!(*reader.current(), vec![12]);
        assert_eq!(reader.len(), 1);
    }

    #[tokio::test]
    async fn test_changed_notifies_readers() {
        let snapshot = LiveSnapshot::new();
        let mut reader = snapshot.reader();

        snapshot.publish(vec![1]);
        assert!(reader.changed().await);
        assert!(reader.is_live(1));

        drop(snapshot);
        assert!(!reader.changed().await);
    }
}
