//! A mutex guarded concurrent singly linked list

use std::alloc::{self, Layout};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use std::{fmt, iter};

use crossbeam_utils::CachePadded;
use log::{debug, trace, warn};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::{InsertError, LockTimeout};

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(0);

type Link<T> = Option<Box<Node<T>>>;

struct Node<T> {
    id: u64,
    data: T,
    next: Link<T>,
}

impl<T> Node<T> {
    /// Box the node without aborting the process on allocation failure.
    fn try_boxed(self) -> Result<Box<Self>, T> {
        let layout = Layout::new::<Self>();
        // SAFETY: the layout is never zero sized, a node always holds the `next` link
        let ptr = unsafe { alloc::alloc(layout) } as *mut Self;
        if ptr.is_null() {
            return Err(self.data);
        }
        // SAFETY: ptr is non-null, aligned for `Self` and allocated by the
        // global allocator with `Layout::new::<Self>()`, as `Box` requires
        unsafe {
            ptr.write(self);
            Ok(Box::from_raw(ptr))
        }
    }
}

/// The lock protected part of the list.
struct Chain<T> {
    head: Link<T>,
    len: usize,
}

impl<T> Chain<T> {
    fn iter(&self) -> impl Iterator<Item = &T> {
        iter::successors(self.head.as_deref(), |node| node.next.as_deref()).map(|node| &node.data)
    }

    fn nth_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        let mut curr = self.head.as_deref_mut();
        for _ in 0..index {
            curr = curr?.next.as_deref_mut();
        }
        curr.map(|node| &mut node.data)
    }

    fn unlink(&mut self, id: u64) -> Option<T> {
        let mut link = &mut self.head;
        while link.as_ref().is_some_and(|node| node.id != id) {
            link = &mut link.as_mut()?.next;
        }
        let node = link.take()?;
        let Node { data, next, .. } = *node;
        *link = next;
        self.len -= 1;
        Some(data)
    }

    /// Detach the whole chain, leaving this one empty.
    fn take(&mut self) -> Chain<T> {
        let len = std::mem::replace(&mut self.len, 0);
        Chain {
            head: self.head.take(),
            len,
        }
    }
}

impl<T> Drop for Chain<T> {
    // unlink node by node, the default recursive drop overflows on long chains
    fn drop(&mut self) {
        let mut curr = self.head.take();
        while let Some(mut node) = curr {
            curr = node.next.take();
        }
    }
}

/// Removal handle returned by [`LinkedList::insert`].
///
/// A ticket identifies exactly one inserted element of exactly one list.
/// Removing with a ticket whose element is already gone, or that belongs to
/// another list, is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    list: u64,
    node: u64,
}

/// A view of an element in a `LinkedList`. You can `deref` it to get the value.
///
/// The list stays locked while the entry is alive, drop it before calling
/// any other method of the same list or the calling thread deadlocks.
pub struct Entry<'a, T>(MappedMutexGuard<'a, T>);

impl<T> Deref for Entry<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> AsRef<T> for Entry<'_, T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T: fmt::Debug> fmt::Debug for Entry<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entry({:?})", self.deref())
    }
}

/// Concurrent singly linked list
///
/// Elements are inserted at the head, so position 0 is always the most
/// recently inserted element. All structural access goes through one
/// non-reentrant mutex.
pub struct LinkedList<T> {
    id: u64,
    next_node_id: AtomicU64,
    // mirror of `chain.len`, only written with the lock held
    len: CachePadded<AtomicUsize>,
    chain: Mutex<Chain<T>>,
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LinkedList<T> {
    /// Creates a new, empty `LinkedList`.
    pub fn new() -> Self {
        Self {
            id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
            next_node_id: AtomicU64::new(0),
            len: CachePadded::new(AtomicUsize::new(0)),
            chain: Mutex::new(Chain { head: None, len: 0 }),
        }
    }

    /// Returns the number of elements.
    ///
    /// This is a snapshot taken without the lock, it may be stale by the time
    /// the caller acts on it.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert an element to the front of the list.
    ///
    /// The node is allocated before the lock is taken. If the allocation
    /// fails the element is returned in [`InsertError::AllocFailed`].
    pub fn insert(&self, elt: T) -> Result<Ticket, InsertError<T>> {
        let node = self.new_node(elt)?;
        let mut chain = self.chain.lock();
        Ok(self.link_front(&mut chain, node))
    }

    /// Same as [`insert`](Self::insert), but gives up and returns the element
    /// if the lock is not acquired within `timeout`.
    pub fn try_insert_for(&self, elt: T, timeout: Duration) -> Result<Ticket, InsertError<T>> {
        let node = self.new_node(elt)?;
        match self.chain.try_lock_for(timeout) {
            Some(mut chain) => Ok(self.link_front(&mut chain, node)),
            None => Err(InsertError::Timeout(node.data)),
        }
    }

    /// Removes the element inserted under `ticket` and returns it.
    ///
    /// Returns `None` if the element was already removed or the ticket comes
    /// from another list; the list is left untouched in that case.
    pub fn remove(&self, ticket: &Ticket) -> Option<T> {
        let mut chain = self.chain.lock();
        self.unlink(&mut chain, ticket)
    }

    /// Same as [`remove`](Self::remove), but gives up if the lock is not
    /// acquired within `timeout`.
    pub fn try_remove_for(
        &self,
        ticket: &Ticket,
        timeout: Duration,
    ) -> Result<Option<T>, LockTimeout> {
        let mut chain = self.chain.try_lock_for(timeout).ok_or(LockTimeout)?;
        Ok(self.unlink(&mut chain, ticket))
    }

    /// Returns true if the element inserted under `ticket` is still in the list.
    pub fn contains(&self, ticket: &Ticket) -> bool {
        if ticket.list != self.id {
            return false;
        }
        let chain = self.chain.lock();
        iter::successors(chain.head.as_deref(), |node| node.next.as_deref())
            .any(|node| node.id == ticket.node)
    }

    /// Returns the element at position `index`, counting from the front.
    ///
    /// The bounds are checked once without the lock to reject obviously
    /// out of range indices, and again under the lock before walking the
    /// chain, so a concurrent removal can never make the walk run off the end.
    pub fn get(&self, index: usize) -> Option<Entry<'_, T>> {
        if index >= self.len() {
            return None;
        }
        MutexGuard::try_map(self.chain.lock(), |chain| chain.nth_mut(index))
            .ok()
            .map(Entry)
    }

    /// Returns the first element of the list, or None if the list is empty.
    pub fn front(&self) -> Option<Entry<'_, T>> {
        self.get(0)
    }

    /// Calls `f` with the element at position `index` while the list is locked.
    pub fn with<R>(&self, index: usize, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.get(index).map(|entry| f(&*entry))
    }

    /// Returns a copy of the element at position `index`.
    pub fn get_cloned(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        self.with(index, T::clone)
    }

    /// Visits every element from front to back under a single lock.
    pub fn for_each(&self, f: impl FnMut(&T)) {
        let chain = self.chain.lock();
        chain.iter().for_each(f);
    }

    /// Copies the elements from front to back.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let chain = self.chain.lock();
        chain.iter().cloned().collect()
    }

    /// Removes all elements, returning how many were dropped. The list
    /// stays usable. Elements are dropped after the lock is released.
    pub fn clear(&self) -> usize {
        let detached = {
            let mut chain = self.chain.lock();
            let detached = chain.take();
            self.len.store(0, Ordering::Release);
            detached
        };
        trace!("list {} cleared {} nodes", self.id, detached.len);
        detached.len
    }

    /// Consumes the list, dropping every element. Returns how many were dropped.
    pub fn teardown(self) -> usize {
        let id = self.id;
        let chain = self.chain.into_inner();
        let len = chain.len;
        drop(chain);
        trace!("list {} torn down, {} nodes dropped", id, len);
        len
    }

    fn new_node(&self, elt: T) -> Result<Box<Node<T>>, InsertError<T>> {
        let id = self.next_node_id.fetch_add(1, Ordering::Relaxed);
        let node = Node {
            id,
            data: elt,
            next: None,
        };
        node.try_boxed().map_err(|elt| {
            warn!("list {}: node allocation failed", self.id);
            InsertError::AllocFailed(elt)
        })
    }

    fn link_front(&self, chain: &mut Chain<T>, mut node: Box<Node<T>>) -> Ticket {
        let ticket = Ticket {
            list: self.id,
            node: node.id,
        };
        node.next = chain.head.take();
        chain.head = Some(node);
        chain.len += 1;
        self.len.store(chain.len, Ordering::Release);
        trace!("list {}: inserted node {}, len {}", self.id, ticket.node, chain.len);
        ticket
    }

    fn unlink(&self, chain: &mut Chain<T>, ticket: &Ticket) -> Option<T> {
        let data = if ticket.list == self.id {
            chain.unlink(ticket.node)
        } else {
            None
        };
        match data {
            Some(_) => {
                self.len.store(chain.len, Ordering::Release);
                trace!("list {}: removed node {}, len {}", self.id, ticket.node, chain.len);
            }
            None => debug!("list {}: element not found for {:?}", self.id, ticket),
        }
        data
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = self.chain.lock();
        f.debug_list().entries(chain.iter()).finish()
    }
}
