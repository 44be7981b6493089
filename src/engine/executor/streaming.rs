use tokio::sync::mpsc;

use crate::engine::executor::response::DataTable;

/// Observer for streaming execution: data-only chunks are pushed as they
/// become available, and a final metadata-only table closes the stream.
pub trait ResultStream: Send + Sync {
    fn send(&self, table: DataTable);
}

impl ResultStream for mpsc::UnboundedSender<DataTable> {
    fn send(&self, table: DataTable) {
        // A dropped receiver means the client went away; nothing to do.
        let _ = mpsc::UnboundedSender::send(self, table);
    }
}
