//! Transport contract used by the mesh layer.
//!
//! Only the communicator operations the mesh itself needs appear here: rank
//! and size queries and communicator duplication. Everything else (message
//! scheduling, ghost exchange) belongs to a transport layer built on top.

use crate::types::Rank;

/// A communicator handle.
///
/// Both query operations are cheap and local. `duplicate` is collective and
/// must be called by every rank of the communicator; the duplicate is owned
/// by the caller and released when dropped.
pub trait Transport {
    /// Rank of this process in the communicator.
    fn rank(&self) -> Rank;
    /// Number of processes in the communicator.
    fn size(&self) -> Rank;
    /// Duplicate the communicator.
    fn duplicate(&self) -> Box<dyn Transport>;
}

/// A size-one communicator with no MPI linkage.
///
/// Rank 0 of 1. Lets a single process build and commit meshes without an MPI
/// runtime, and serves as the size-one harness for collective operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Transport for SerialComm {
    fn rank(&self) -> Rank {
        0
    }

    fn size(&self) -> Rank {
        1
    }

    fn duplicate(&self) -> Box<dyn Transport> {
        Box::new(SerialComm)
    }
}

#[cfg(feature = "mpi")]
mod mpi_comm {
    use super::Transport;
    use crate::types::Rank;
    use mpi::topology::{SystemCommunicator, UserCommunicator};
    use mpi::traits::Communicator;

    impl Transport for SystemCommunicator {
        fn rank(&self) -> Rank {
            Communicator::rank(self)
        }

        fn size(&self) -> Rank {
            Communicator::size(self)
        }

        fn duplicate(&self) -> Box<dyn Transport> {
            Box::new(Communicator::duplicate(self))
        }
    }

    impl Transport for UserCommunicator {
        fn rank(&self) -> Rank {
            Communicator::rank(self)
        }

        fn size(&self) -> Rank {
            Communicator::size(self)
        }

        fn duplicate(&self) -> Box<dyn Transport> {
            Box::new(Communicator::duplicate(self))
        }
    }
}

/// A fake communicator reporting a fixed rank and size.
///
/// Test harness for simulating the view of one rank out of many without an
/// MPI runtime; it cannot communicate.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct FakeComm {
    rank: Rank,
    size: Rank,
}

#[cfg(test)]
impl FakeComm {
    pub fn new(rank: Rank, size: Rank) -> Self {
        assert!(0 <= rank && rank < size);
        Self { rank, size }
    }
}

#[cfg(test)]
impl Transport for FakeComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> Rank {
        self.size
    }

    fn duplicate(&self) -> Box<dyn Transport> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_serial_comm() {
        let comm = SerialComm;
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        let dup = comm.duplicate();
        assert_eq!(dup.rank(), 0);
        assert_eq!(dup.size(), 1);
    }

    #[test]
    fn test_fake_comm_reports_fixed_view() {
        let comm = FakeComm::new(2, 5);
        assert_eq!(comm.rank(), 2);
        assert_eq!(comm.size(), 5);
        assert_eq!(comm.duplicate().rank(), 2);
    }
}
