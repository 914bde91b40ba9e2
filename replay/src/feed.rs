//! Stands in for the backend: answers window queries from a recording loaded up front, on its
//! own thread.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use playback::{Batch, BatchQuery};

/// A batch, along with the query it answers.
pub struct Answer {
    pub query: BatchQuery,
    pub batch: Batch,
}

pub struct Feed {
    queries: Sender<BatchQuery>,
    pub answers: Receiver<Answer>,
    handle: JoinHandle<()>,
}

impl Feed {
    pub fn spawn(recording: Batch) -> Feed {
        let (queries, query_rx) = crossbeam_channel::unbounded::<BatchQuery>();
        let (answer_tx, answers) = crossbeam_channel::unbounded();
        let handle = std::thread::spawn(move || {
            for query in query_rx.iter() {
                let batch = recording.window(&query);
                debug!(
                    "Answering query at {} with {} objects",
                    query.timestamp,
                    batch.len()
                );
                if answer_tx.send(Answer { query, batch }).is_err() {
                    break;
                }
            }
        });
        Feed {
            queries,
            answers,
            handle,
        }
    }

    pub fn request(&self, query: BatchQuery) -> anyhow::Result<()> {
        self.queries
            .send(query)
            .map_err(|_| anyhow!("the feed thread is gone"))
    }

    /// Hangs up and waits for the thread to finish.
    pub fn shutdown(self) -> anyhow::Result<()> {
        drop(self.queries);
        self.handle
            .join()
            .map_err(|_| anyhow!("the feed thread panicked"))
    }
}
