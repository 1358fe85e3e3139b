//! Raw FFI bindings to the sqlite3mc static library compiled by `build.rs`.
//!
//! This is the **only** file in the crate that contains `unsafe` code or C
//! types. [`RawDb`] and [`RawStmt`] own the raw pointers and expose a small,
//! safe surface to the rest of the `db` module.

#![allow(non_camel_case_types)]

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr::{self, NonNull};

use zeroize::Zeroize;

use super::error::{DbError, DbResult};

// ── SQLite constants ────────────────────────────────────────────────────

pub const SQLITE_OK: c_int = 0;
pub const SQLITE_ERROR: c_int = 1;
pub const SQLITE_CANTOPEN: c_int = 14;
pub const SQLITE_NOTADB: c_int = 26;
pub const SQLITE_ROW: c_int = 100;
pub const SQLITE_DONE: c_int = 101;

// Open flags
pub const SQLITE_OPEN_READONLY: c_int = 0x0000_0001;
pub const SQLITE_OPEN_READWRITE: c_int = 0x0000_0002;
pub const SQLITE_OPEN_CREATE: c_int = 0x0000_0004;
pub const SQLITE_OPEN_FULLMUTEX: c_int = 0x0001_0000;

type sqlite3 = c_void;
type sqlite3_stmt = c_void;

extern "C" {
    fn sqlite3_open_v2(
        filename: *const c_char,
        pp_db: *mut *mut sqlite3,
        flags: c_int,
        z_vfs: *const c_char,
    ) -> c_int;

    fn sqlite3_close_v2(db: *mut sqlite3) -> c_int;

    fn sqlite3_exec(
        db: *mut sqlite3,
        sql: *const c_char,
        callback: *const c_void,
        arg: *mut c_void,
        errmsg: *mut *mut c_char,
    ) -> c_int;

    fn sqlite3_free(ptr: *mut c_void);

    fn sqlite3_prepare_v2(
        db: *mut sqlite3,
        z_sql: *const c_char,
        n_byte: c_int,
        pp_stmt: *mut *mut sqlite3_stmt,
        pz_tail: *mut *const c_char,
    ) -> c_int;

    fn sqlite3_step(stmt: *mut sqlite3_stmt) -> c_int;
    fn sqlite3_finalize(stmt: *mut sqlite3_stmt) -> c_int;

    fn sqlite3_column_int64(stmt: *mut sqlite3_stmt, i_col: c_int) -> i64;
    fn sqlite3_column_text(stmt: *mut sqlite3_stmt, i_col: c_int) -> *const c_char;

    fn sqlite3_errmsg(db: *mut sqlite3) -> *const c_char;
}

fn to_c_string(sql: &str) -> DbResult<CString> {
    CString::new(sql).map_err(|e| DbError::new(SQLITE_ERROR, format!("nul in SQL: {e}")))
}

/// Owned `sqlite3*` handle. Closed on drop.
pub struct RawDb {
    db: NonNull<sqlite3>,
}

// Safety: the handle is opened with SQLITE_OPEN_FULLMUTEX and `RawDb` is not
// `Sync`, so it is only ever used from one thread at a time.
unsafe impl Send for RawDb {}

impl RawDb {
    /// Opens (or creates, depending on `flags`) the database at `path`.
    pub fn open(path: &str, flags: c_int) -> DbResult<Self> {
        let c_path = CString::new(path)
            .map_err(|e| DbError::new(SQLITE_ERROR, format!("invalid path: {e}")))?;
        let mut db: *mut sqlite3 = ptr::null_mut();
        let rc = unsafe { sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        match NonNull::new(db) {
            Some(handle) if rc == SQLITE_OK => Ok(Self { db: handle }),
            Some(handle) => {
                // A handle is returned even on failure; read its message and close it.
                let message = errmsg_raw(handle.as_ptr());
                unsafe {
                    sqlite3_close_v2(handle.as_ptr());
                }
                Err(DbError::new(rc, message))
            }
            None => Err(DbError::new(rc, format!("sqlite3_open_v2 returned {rc}"))),
        }
    }

    /// Runs one or more semicolon separated statements via `sqlite3_exec`.
    pub fn exec(&self, sql: &str) -> DbResult<()> {
        let c_sql = to_c_string(sql)?;
        self.exec_c(&c_sql)
    }

    /// Like [`exec`](Self::exec) but wipes the C copy of `sql` afterwards.
    pub fn exec_zeroized(&self, sql: &str) -> DbResult<()> {
        let c_sql = to_c_string(sql)?;
        let result = self.exec_c(&c_sql);
        let mut bytes = c_sql.into_bytes_with_nul();
        bytes.zeroize();
        result
    }

    fn exec_c(&self, c_sql: &CStr) -> DbResult<()> {
        let mut errmsg: *mut c_char = ptr::null_mut();
        let rc = unsafe {
            sqlite3_exec(
                self.db.as_ptr(),
                c_sql.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
                &mut errmsg,
            )
        };
        if rc == SQLITE_OK {
            return Ok(());
        }
        let message = if errmsg.is_null() {
            errmsg_raw(self.db.as_ptr())
        } else {
            let s = unsafe { CStr::from_ptr(errmsg) }
                .to_string_lossy()
                .into_owned();
            unsafe {
                sqlite3_free(errmsg.cast());
            }
            s
        };
        Err(DbError::new(rc, message))
    }

    /// Prepares a single statement.
    pub fn prepare(&self, sql: &str) -> DbResult<RawStmt<'_>> {
        let c_sql = to_c_string(sql)?;
        let mut stmt: *mut sqlite3_stmt = ptr::null_mut();
        let rc = unsafe {
            sqlite3_prepare_v2(
                self.db.as_ptr(),
                c_sql.as_ptr(),
                -1,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        match NonNull::new(stmt) {
            Some(stmt) if rc == SQLITE_OK => Ok(RawStmt {
                stmt,
                db: self.db,
                _conn: PhantomData,
            }),
            Some(stmt) => {
                unsafe {
                    sqlite3_finalize(stmt.as_ptr());
                }
                Err(DbError::new(rc, errmsg_raw(self.db.as_ptr())))
            }
            // Empty SQL (whitespace or comment only) prepares to NULL.
            None if rc == SQLITE_OK => {
                Err(DbError::new(SQLITE_ERROR, "empty statement"))
            }
            None => Err(DbError::new(rc, errmsg_raw(self.db.as_ptr()))),
        }
    }
}

impl Drop for RawDb {
    fn drop(&mut self) {
        unsafe {
            sqlite3_close_v2(self.db.as_ptr());
        }
    }
}

/// Prepared `sqlite3_stmt*` borrowed from a [`RawDb`]. Finalized on drop.
pub struct RawStmt<'conn> {
    stmt: NonNull<sqlite3_stmt>,
    db: NonNull<sqlite3>,
    _conn: PhantomData<&'conn RawDb>,
}

impl RawStmt<'_> {
    /// Steps the statement, returning `SQLITE_ROW` or `SQLITE_DONE`.
    pub fn step(&self) -> DbResult<c_int> {
        let rc = unsafe { sqlite3_step(self.stmt.as_ptr()) };
        match rc {
            SQLITE_ROW | SQLITE_DONE => Ok(rc),
            _ => Err(DbError::new(rc, errmsg_raw(self.db.as_ptr()))),
        }
    }

    pub fn column_i64(&self, idx: c_int) -> i64 {
        unsafe { sqlite3_column_int64(self.stmt.as_ptr(), idx) }
    }

    /// Returns an empty string for NULL.
    pub fn column_text(&self, idx: c_int) -> String {
        let text = unsafe { sqlite3_column_text(self.stmt.as_ptr(), idx) };
        if text.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(text) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Drop for RawStmt<'_> {
    fn drop(&mut self) {
        unsafe {
            sqlite3_finalize(self.stmt.as_ptr());
        }
    }
}

fn errmsg_raw(db: *mut sqlite3) -> String {
    let msg = unsafe { sqlite3_errmsg(db) };
    if msg.is_null() {
        "unknown error".to_string()
    } else {
        unsafe { CStr::from_ptr(msg) }
            .to_string_lossy()
            .into_owned()
    }
}
