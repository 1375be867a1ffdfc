use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::data::CommentService;
use crate::feed::Comment;

/// What the thread area should render for an expanded post.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadPhase {
    Loading,
    Loaded(Vec<Comment>),
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadState {
    pub phase: ThreadPhase,
}

struct PendingThread {
    token: u64,
    cancel_flag: Arc<AtomicBool>,
}

struct ThreadResponse {
    post_id: i64,
    token: u64,
    result: Result<Vec<Comment>>,
}

/// Materializes a post's comment thread only while it is expanded.
///
/// Expanding spawns a background fetch tagged with a per-post request token;
/// collapsing discards the stored comments and cancels the fetch. Tokens only
/// ever grow, so a fetch that resolves after its thread was collapsed or
/// reopened can never overwrite newer state. There is no caching: re-opening
/// always re-fetches.
pub struct CommentThreadLoader {
    service: Arc<dyn CommentService>,
    response_tx: Sender<ThreadResponse>,
    response_rx: Receiver<ThreadResponse>,
    tokens: HashMap<i64, u64>,
    pending: HashMap<i64, PendingThread>,
    threads: HashMap<i64, ThreadState>,
}

impl CommentThreadLoader {
    pub fn new(service: Arc<dyn CommentService>) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            service,
            response_tx,
            response_rx,
            tokens: HashMap::new(),
            pending: HashMap::new(),
            threads: HashMap::new(),
        }
    }

    /// Expand or collapse a post's thread. Expanding an expanded post or
    /// collapsing a collapsed one is a no-op.
    pub fn set_visible(&mut self, post_id: i64, visible: bool) {
        if visible == self.is_visible(post_id) {
            return;
        }
        if visible {
            self.begin_fetch(post_id);
        } else {
            self.threads.remove(&post_id);
            if let Some(pending) = self.pending.remove(&post_id) {
                pending.cancel_flag.store(true, Ordering::SeqCst);
            }
        }
    }

    fn begin_fetch(&mut self, post_id: i64) {
        let token = {
            let entry = self.tokens.entry(post_id).or_insert(0);
            *entry += 1;
            *entry
        };

        if let Some(previous) = self.pending.remove(&post_id) {
            previous.cancel_flag.store(true, Ordering::SeqCst);
        }

        self.threads.insert(
            post_id,
            ThreadState {
                phase: ThreadPhase::Loading,
            },
        );

        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.pending.insert(
            post_id,
            PendingThread {
                token,
                cancel_flag: cancel_flag.clone(),
            },
        );

        let service = self.service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let result = service.comments_for_post(post_id);
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(ThreadResponse {
                post_id,
                token,
                result,
            });
        });
    }

    /// Drain completed fetches and commit the ones that still matter.
    /// Returns true when any thread changed, so the caller knows to redraw.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(response) = self.response_rx.try_recv() {
            if self.commit(response) {
                changed = true;
            }
        }
        changed
    }

    fn commit(&mut self, response: ThreadResponse) -> bool {
        let current = self.tokens.get(&response.post_id).copied().unwrap_or(0);
        if response.token != current {
            return false;
        }
        let Some(state) = self.threads.get_mut(&response.post_id) else {
            // Collapsed while the fetch was in flight.
            return false;
        };
        if state.phase != ThreadPhase::Loading {
            return false;
        }
        self.pending.remove(&response.post_id);
        state.phase = match response.result {
            Ok(comments) => ThreadPhase::Loaded(comments),
            Err(_) => ThreadPhase::Failed,
        };
        true
    }

    pub fn thread(&self, post_id: i64) -> Option<&ThreadState> {
        self.threads.get(&post_id)
    }

    pub fn is_visible(&self, post_id: i64) -> bool {
        self.threads.contains_key(&post_id)
    }

    pub fn is_loading(&self, post_id: i64) -> bool {
        matches!(
            self.thread(post_id),
            Some(ThreadState {
                phase: ThreadPhase::Loading
            })
        )
    }

    pub fn any_loading(&self) -> bool {
        self.threads
            .values()
            .any(|state| state.phase == ThreadPhase::Loading)
    }

    /// Current request token for a post; grows on every expand.
    pub fn current_token(&self, post_id: i64) -> u64 {
        self.tokens.get(&post_id).copied().unwrap_or(0)
    }

    /// Drop all thread state, cancelling anything in flight. Used when the
    /// feed itself is replaced.
    pub fn clear(&mut self) {
        for pending in self.pending.values() {
            pending.cancel_flag.store(true, Ordering::SeqCst);
        }
        self.pending.clear();
        self.threads.clear();
    }
}
