//! Translation between host attributes and POSIX metadata.
//!
//! The host keeps a coarse read/write/execute permission set, a byte size and
//! three timestamps counted in 100 ns ticks on its own epoch. The VFS wants
//! mode bits, ownership, block counts and Unix seconds. The functions here are
//! pure; handlers call them on freshly fetched host attributes.

use bitflags::bitflags;

/// Block size reported to the VFS and used to synthesize block counts.
pub const FAKE_BLOCK_SIZE: u32 = 512;

/// Host timestamps count 100 ns ticks.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Seconds between the host epoch and the Unix epoch.
pub const EPOCH_OFFSET_SECS: i64 = 11_644_466_400;

/// Owner and group reported for every entry.
pub const FIXED_OWNER: u32 = 0;

/// File type mask.
pub const S_IFMT: u32 = 0o170_000;
/// Directory file type.
pub const S_IFDIR: u32 = 0o040_000;
/// Regular file type.
pub const S_IFREG: u32 = 0o100_000;

/// Owner read.
pub const S_IRUSR: u32 = 0o400;
/// Owner write.
pub const S_IWUSR: u32 = 0o200;
/// Owner execute.
pub const S_IXUSR: u32 = 0o100;
/// Group read.
pub const S_IRGRP: u32 = 0o040;
/// Group write.
pub const S_IWGRP: u32 = 0o020;
/// Group execute.
pub const S_IXGRP: u32 = 0o010;
/// Other read.
pub const S_IROTH: u32 = 0o004;
/// Other write.
pub const S_IWOTH: u32 = 0o002;
/// Other execute.
pub const S_IXOTH: u32 = 0o001;

bitflags! {
    /// Host permission bits. Not split into owner/group/other classes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Permissions: u8 {
        /// Entry may be read.
        const READ = 0b100;
        /// Entry may be written.
        const WRITE = 0b010;
        /// Entry may be executed (or searched, for directories).
        const EXECUTE = 0b001;
    }
}

bitflags! {
    /// Host attribute fields to write in a set-attributes call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RemoteAttrMask: u32 {
        /// Permission bits.
        const PERMISSIONS = 1 << 0;
        /// Byte size (truncate/extend).
        const SIZE = 1 << 1;
        /// Last access time.
        const ACCESS_TIME = 1 << 2;
        /// Last modification time.
        const WRITE_TIME = 1 << 3;
        /// Creation time.
        const CREATION_TIME = 1 << 4;
    }
}

bitflags! {
    /// Metadata fields named by a write-stat request from the VFS.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatMask: u32 {
        /// Mode (permission) bits.
        const MODE = 0x0001;
        /// Owner.
        const UID = 0x0002;
        /// Group.
        const GID = 0x0004;
        /// Size.
        const SIZE = 0x0008;
        /// Access time.
        const ATIME = 0x0010;
        /// Modification time.
        const MTIME = 0x0020;
        /// Creation time.
        const CRTIME = 0x0040;
    }
}

/// Attributes as the host stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteAttributes {
    /// Coarse permission bits.
    pub permissions: Permissions,
    /// Size in bytes. Meaningless for directories.
    pub size: u64,
    /// Creation time in host ticks.
    pub creation_time: u64,
    /// Last access time in host ticks.
    pub access_time: u64,
    /// Last modification time in host ticks.
    pub write_time: u64,
}

/// POSIX-shaped metadata for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Metadata {
    /// Volume identity (the root node's identity).
    pub dev: u64,
    /// Node identity.
    pub ino: u64,
    /// File type and permission bits.
    pub mode: u32,
    /// Always 1.
    pub nlink: u32,
    /// Always [`FIXED_OWNER`].
    pub uid: u32,
    /// Always [`FIXED_OWNER`].
    pub gid: u32,
    /// Size in bytes; 0 for directories.
    pub size: u64,
    /// Always [`FAKE_BLOCK_SIZE`].
    pub blksize: u32,
    /// `ceil(size / blksize)`.
    pub blocks: u64,
    /// Last access, Unix seconds.
    pub atime: i64,
    /// Last modification, Unix seconds.
    pub mtime: i64,
    /// Status change, Unix seconds. Same as `crtime`.
    pub ctime: i64,
    /// Creation, Unix seconds.
    pub crtime: i64,
}

impl Metadata {
    /// Returns true if the mode describes a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    /// Permission bits without the file type.
    #[inline]
    pub fn permission_bits(&self) -> u32 {
        self.mode & !S_IFMT
    }
}

/// Converts host ticks to Unix seconds.
#[inline]
pub fn ticks_to_unix(ticks: u64) -> i64 {
    // u64::MAX / 10^7 fits in i64
    #[allow(clippy::cast_possible_wrap)]
    let secs = (ticks / TICKS_PER_SECOND.unsigned_abs()) as i64;
    secs - EPOCH_OFFSET_SECS
}

/// Converts Unix seconds to host ticks.
///
/// Times before the host epoch saturate to 0; times past the end of the tick
/// range saturate to `u64::MAX`.
#[inline]
pub fn unix_to_ticks(secs: i64) -> u64 {
    let since_epoch = u64::try_from(secs.saturating_add(EPOCH_OFFSET_SECS)).unwrap_or(0);
    since_epoch.saturating_mul(TICKS_PER_SECOND.unsigned_abs())
}

/// Builds POSIX mode bits from host permissions.
///
/// Read and execute are granted to every class; write only to the owner.
pub fn mode_bits(permissions: Permissions, is_dir: bool) -> u32 {
    let mut mode = if is_dir { S_IFDIR } else { S_IFREG };
    if permissions.contains(Permissions::READ) {
        mode |= S_IRUSR | S_IRGRP | S_IROTH;
    }
    if permissions.contains(Permissions::WRITE) {
        mode |= S_IWUSR;
    }
    if permissions.contains(Permissions::EXECUTE) {
        mode |= S_IXUSR | S_IXGRP | S_IXOTH;
    }
    mode
}

/// Recovers host permissions from the owner bits of a mode.
pub fn permissions_from_mode(mode: u32) -> Permissions {
    let mut permissions = Permissions::empty();
    if mode & S_IRUSR == S_IRUSR {
        permissions |= Permissions::READ;
    }
    if mode & S_IWUSR == S_IWUSR {
        permissions |= Permissions::WRITE;
    }
    if mode & S_IXUSR == S_IXUSR {
        permissions |= Permissions::EXECUTE;
    }
    permissions
}

/// Translates host attributes into the metadata the VFS expects.
pub fn to_metadata(
    attributes: &RemoteAttributes,
    is_dir: bool,
    ino: u64,
    dev: u64,
) -> Metadata {
    // The host reports a size for directories that has nothing to do with content.
    let size = if is_dir { 0 } else { attributes.size };
    let created = ticks_to_unix(attributes.creation_time);

    Metadata {
        dev,
        ino,
        mode: mode_bits(attributes.permissions, is_dir),
        nlink: 1,
        uid: FIXED_OWNER,
        gid: FIXED_OWNER,
        size,
        blksize: FAKE_BLOCK_SIZE,
        blocks: size.div_ceil(u64::from(FAKE_BLOCK_SIZE)),
        atime: ticks_to_unix(attributes.access_time),
        mtime: ticks_to_unix(attributes.write_time),
        ctime: created,
        crtime: created,
    }
}

/// Translates a metadata write into host attributes and the host field mask.
///
/// Only fields named in `mask` are carried over; the rest of the returned
/// attributes stay at their defaults and are excluded from the returned mask.
/// `CRTIME` takes its value from `ctime`. `UID` and `GID` have no host
/// counterpart and are dropped.
pub fn to_attribute_update(
    metadata: &Metadata,
    mask: StatMask,
) -> (RemoteAttributes, RemoteAttrMask) {
    let mut attributes = RemoteAttributes::default();
    let mut remote_mask = RemoteAttrMask::empty();

    if mask.contains(StatMask::MODE) {
        attributes.permissions = permissions_from_mode(metadata.mode);
        remote_mask |= RemoteAttrMask::PERMISSIONS;
    }
    if mask.contains(StatMask::SIZE) {
        attributes.size = metadata.size;
        remote_mask |= RemoteAttrMask::SIZE;
    }
    if mask.contains(StatMask::ATIME) {
        attributes.access_time = unix_to_ticks(metadata.atime);
        remote_mask |= RemoteAttrMask::ACCESS_TIME;
    }
    if mask.contains(StatMask::MTIME) {
        attributes.write_time = unix_to_ticks(metadata.mtime);
        remote_mask |= RemoteAttrMask::WRITE_TIME;
    }
    if mask.contains(StatMask::CRTIME) {
        // Read back as both ctime and crtime; written from ctime.
        attributes.creation_time = unix_to_ticks(metadata.ctime);
        remote_mask |= RemoteAttrMask::CREATION_TIME;
    }

    (attributes, remote_mask)
}
