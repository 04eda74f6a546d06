use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use zarya_device::ElementType;

/// Stable identity of a host buffer.
///
/// Ids come from a process-global monotonic counter and are assigned once,
/// when the buffer is created. Registries key on them instead of value or
/// address hashes, so two distinct buffers can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// A host-side data object participating in device computation.
///
/// Buffers are shared into tasks and contexts via `Rc` and are deliberately
/// not `Send`: a single host thread owns an execution context and everything
/// it references.
pub struct Buffer {
    id: BufferId,
    element: ElementType,
    data: RefCell<Vec<u8>>,
}

impl Buffer {
    /// Zero-initialized buffer of `len` elements.
    pub fn new(element: ElementType, len: usize) -> Rc<Self> {
        Self::from_bytes(element, vec![0u8; len * element.bytes()])
    }

    pub fn from_bytes(element: ElementType, bytes: Vec<u8>) -> Rc<Self> {
        Rc::new(Self {
            id: BufferId(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed)),
            element,
            data: RefCell::new(bytes),
        })
    }

    pub fn from_f32(values: &[f32]) -> Rc<Self> {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_bytes(ElementType::F32, bytes)
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.borrow().len() / self.element.bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn data(&self) -> Ref<'_, Vec<u8>> {
        self.data.borrow()
    }

    pub fn data_mut(&self) -> RefMut<'_, Vec<u8>> {
        self.data.borrow_mut()
    }

    /// Reinterpret the payload as little-endian f32 values.
    pub fn to_f32(&self) -> Vec<f32> {
        self.data
            .borrow()
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("element", &self.element)
            .field("bytes", &self.size_bytes())
            .finish()
    }
}
