//! File descriptors: single-use sessions over an open file.

use crate::error::{Error, Result};
use crate::editor::DagEditor;
use crate::file::{File, Flags};
use std::io::SeekFrom;
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

/// The descriptor-lock state acquired by an open call. Dropping it releases
/// the lock; it travels with the descriptor so release happens exactly once.
pub(crate) enum SessionLock<'f> {
    Shared(RwLockReadGuard<'f, ()>),
    Exclusive(RwLockWriteGuard<'f, ()>),
}

/// A session over one open of a file.
///
/// Bound to one file, one set of flags and one content editor. Descriptors
/// are single-use: `close` consumes the descriptor, commits outstanding
/// writes when the session was opened for writing, and releases the lock
/// taken by `File::open`. Dropping a descriptor without closing releases the
/// lock and discards uncommitted writes.
pub struct FileDescriptor<'f> {
    file: &'f File,
    flags: Flags,
    editor: DagEditor,
    cursor: u64,
    _lock: SessionLock<'f>,
}

impl<'f> FileDescriptor<'f> {
    pub(crate) fn new(
        file: &'f File,
        flags: Flags,
        editor: DagEditor,
        lock: SessionLock<'f>,
    ) -> Self {
        Self {
            file,
            flags,
            editor,
            cursor: 0,
            _lock: lock,
        }
    }

    /// Flags this descriptor was opened with.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Logical size of the session's content, including uncommitted writes.
    pub fn size(&self) -> u64 {
        self.editor.size()
    }

    /// Read at the cursor, advancing it. Returns the number of bytes read;
    /// 0 at end of file.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.flags.read {
            return Err(Error::NotOpenedForReading);
        }
        let n = self.editor.read_at(self.cursor, buf)?;
        self.cursor += n as u64;
        Ok(n)
    }

    /// Read at an explicit offset without moving the cursor.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if !self.flags.read {
            return Err(Error::NotOpenedForReading);
        }
        self.editor.read_at(offset, buf)
    }

    /// Write at the cursor, advancing it past the written bytes.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.flags.write {
            return Err(Error::NotOpenedForWriting);
        }
        let n = self.editor.write_at(self.cursor, data)?;
        self.cursor += n as u64;
        Ok(n)
    }

    /// Write at an explicit offset without moving the cursor.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        if !self.flags.write {
            return Err(Error::NotOpenedForWriting);
        }
        self.editor.write_at(offset, data)
    }

    /// Resize the content to `len` bytes. The cursor is left in place.
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        if !self.flags.write {
            return Err(Error::NotOpenedForWriting);
        }
        self.editor.truncate(len)
    }

    /// Move the cursor; returns the new position.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.editor.size().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.cursor.checked_add_signed(delta),
        };
        let target = target
            .ok_or_else(|| Error::invalid_seek(format!("position out of range: {:?}", pos)))?;
        self.cursor = target;
        Ok(target)
    }

    /// Commit outstanding writes and replace the file's root node without
    /// releasing the descriptor lock, so the session may continue.
    pub fn flush(&mut self) -> Result<()> {
        if !self.flags.write {
            return Err(Error::NotOpenedForWriting);
        }
        self.commit_to_file()
    }

    /// Close the session. Commits outstanding writes when opened for
    /// writing; the descriptor lock is released when the descriptor drops,
    /// on the error path as well.
    pub fn close(mut self) -> Result<()> {
        if self.flags.write {
            self.commit_to_file()?;
        }
        Ok(())
    }

    /// Commit through the editor, swap the file's root under the node lock
    /// and report the new root upward. Clean sessions do nothing.
    fn commit_to_file(&mut self) -> Result<()> {
        if !self.editor.is_dirty() {
            return Ok(());
        }
        let (cid, node) = self.editor.commit()?;
        self.file.set_node(cid, node);
        self.file.report_root(&cid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::detached_parent;
    use crate::node::Node;
    use crate::store::{MemoryStore, NodeStore};
    use std::sync::Arc;

    fn open_file(content: &[u8]) -> File {
        let store: Arc<dyn NodeStore> = Arc::new(MemoryStore::new());
        let node = Node::Raw(content.to_vec());
        let cid = store.put(&node, 1).unwrap();
        File::new("fd.bin", cid, node, detached_parent(), store).unwrap()
    }

    fn rw_flags() -> Flags {
        Flags {
            read: true,
            write: true,
            sync: false,
        }
    }

    #[test]
    fn test_cursor_read_write() {
        let file = open_file(b"");
        let mut fd = file.open(rw_flags()).unwrap();

        assert_eq!(fd.write(b"hello ").unwrap(), 6);
        assert_eq!(fd.write(b"world").unwrap(), 5);
        assert_eq!(fd.size(), 11);

        fd.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = [0u8; 11];
        assert_eq!(fd.read(&mut buf).unwrap(), 11);
        assert_eq!(&buf, b"hello world");

        // Cursor is now at end of file
        assert_eq!(fd.read(&mut buf).unwrap(), 0);
        fd.close().unwrap();
    }

    #[test]
    fn test_seek_variants() {
        let file = open_file(b"0123456789");
        let mut fd = file.open(rw_flags()).unwrap();

        assert_eq!(fd.seek(SeekFrom::End(-4)).unwrap(), 6);
        let mut buf = [0u8; 4];
        fd.read(&mut buf).unwrap();
        assert_eq!(&buf, b"6789");

        assert_eq!(fd.seek(SeekFrom::Current(-2)).unwrap(), 8);
        assert!(fd.seek(SeekFrom::Current(-20)).is_err());
        assert!(fd.seek(SeekFrom::End(-11)).is_err());
        fd.close().unwrap();
    }

    #[test]
    fn test_read_only_descriptor_rejects_writes() {
        let file = open_file(b"content");
        let mut fd = file
            .open(Flags {
                read: true,
                write: false,
                sync: false,
            })
            .unwrap();

        assert!(matches!(fd.write(b"x"), Err(Error::NotOpenedForWriting)));
        assert!(matches!(fd.truncate(0), Err(Error::NotOpenedForWriting)));
        assert!(matches!(fd.flush(), Err(Error::NotOpenedForWriting)));
        fd.close().unwrap();

        // Nothing changed
        assert_eq!(file.size().unwrap(), 7);
    }

    #[test]
    fn test_write_only_descriptor_rejects_reads() {
        let file = open_file(b"content");
        let mut fd = file
            .open(Flags {
                read: false,
                write: true,
                sync: false,
            })
            .unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(fd.read(&mut buf), Err(Error::NotOpenedForReading)));
        assert!(matches!(
            fd.read_at(0, &mut buf),
            Err(Error::NotOpenedForReading)
        ));
        fd.close().unwrap();
    }

    #[test]
    fn test_truncate_commits_new_length() {
        let file = open_file(b"long content here");
        let mut fd = file.open(rw_flags()).unwrap();
        fd.truncate(4).unwrap();
        fd.close().unwrap();

        assert_eq!(file.size().unwrap(), 4);
        assert_eq!(file.node(), Node::Raw(b"long".to_vec()));
    }

    #[test]
    fn test_flush_keeps_session_open() {
        let file = open_file(b"");
        let mut fd = file.open(rw_flags()).unwrap();

        fd.write(b"first").unwrap();
        fd.flush().unwrap();
        assert_eq!(file.size().unwrap(), 5);

        // The session continues writing after the flush
        fd.write(b" second").unwrap();
        fd.close().unwrap();
        assert_eq!(file.size().unwrap(), 12);
        assert_eq!(file.node(), Node::Raw(b"first second".to_vec()));
    }

    #[test]
    fn test_close_replaces_node() {
        let file = open_file(b"old");
        let before = file.cid();

        let mut fd = file.open(rw_flags()).unwrap();
        fd.write_at(0, b"new").unwrap();
        fd.close().unwrap();

        assert_ne!(file.cid(), before);
        assert_eq!(file.node(), Node::Raw(b"new".to_vec()));
    }

    #[test]
    fn test_drop_without_close_discards_writes() {
        let file = open_file(b"keep");
        {
            let mut fd = file.open(rw_flags()).unwrap();
            fd.write_at(0, b"lost").unwrap();
            // dropped here without close
        }
        assert_eq!(file.node(), Node::Raw(b"keep".to_vec()));

        // and the lock was released
        let fd = file.open(rw_flags()).unwrap();
        fd.close().unwrap();
    }
}
