//! Command execution: parsed frames in, RESP replies out.
//!
//! The dispatcher receives a request as an array of bulk strings, matches
//! the verb case-insensitively, validates arguments, and calls into the
//! storage engine. Validation happens before any mutation: a `ZADD` with
//! a NaN score anywhere in its pair list leaves the set untouched.
//!
//! Missing keys are never errors: they come back as nil, `:0`, `:-2`, or
//! an empty array, whichever fits the command's reply type. Actual errors
//! (wrong type, malformed arguments, out-of-range numbers) become `-ERR`
//! / `-WRONGTYPE` replies and leave the connection open.

use crate::protocol::RespValue;
use crate::storage::{StoreError, StorageEngine, ZAddOutcome};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Executes commands against a shared storage engine.
///
/// Cheap to clone: one handler is created per connection, all sharing the
/// same engine.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes one parsed request frame and produces the reply.
    pub fn execute(&self, request: RespValue) -> RespValue {
        let args = match request {
            RespValue::Array(args) => args,
            _ => return RespValue::error("ERR invalid request format"),
        };
        let Some((verb_arg, rest)) = args.split_first() else {
            return RespValue::error("ERR empty command");
        };
        let Some(verb) = arg_str(verb_arg) else {
            return RespValue::error("ERR invalid command name");
        };

        match verb.to_uppercase().as_str() {
            "PING" => self.cmd_ping(rest),
            "SET" => self.cmd_set(rest),
            "GET" => self.cmd_get(rest),
            "DEL" => self.cmd_del(rest),
            "EXISTS" => self.cmd_exists(rest),
            "SETNX" => self.cmd_setnx(rest),
            "SETEX" => self.cmd_setex(rest),
            "EXPIRE" => self.cmd_expire(rest),
            "TTL" => self.cmd_ttl(rest),
            "DBSIZE" => self.cmd_dbsize(rest),
            "FLUSHDB" => self.cmd_flushdb(rest),
            "INCR" => self.cmd_incr_by(rest, 1, false, "incr"),
            "DECR" => self.cmd_incr_by(rest, -1, false, "decr"),
            "INCRBY" => self.cmd_incr_by(rest, 1, true, "incrby"),
            "DECRBY" => self.cmd_incr_by(rest, -1, true, "decrby"),
            "ZADD" => self.cmd_zadd(rest),
            "ZREM" => self.cmd_zrem(rest),
            "ZSCORE" => self.cmd_zscore(rest),
            "ZRANGE" => self.cmd_zrange(rest),
            "ZRANGEBYSCORE" => self.cmd_zrangebyscore(rest),
            "ZRANK" => self.cmd_zrank(rest),
            "ZCARD" => self.cmd_zcard(rest),
            other => RespValue::error(format!("ERR unknown command '{other}'")),
        }
    }

    // ------------------------------------------------------------------
    // Server commands
    // ------------------------------------------------------------------

    /// PING [message]
    fn cmd_ping(&self, args: &[RespValue]) -> RespValue {
        match args {
            [] => RespValue::pong(),
            [message] => match arg_bytes(message) {
                Some(payload) => RespValue::bulk(payload),
                None => RespValue::error("ERR invalid argument"),
            },
            _ => wrong_arity("ping"),
        }
    }

    /// DBSIZE
    fn cmd_dbsize(&self, args: &[RespValue]) -> RespValue {
        if !args.is_empty() {
            return wrong_arity("dbsize");
        }
        RespValue::integer(self.storage.dbsize() as i64)
    }

    /// FLUSHDB
    fn cmd_flushdb(&self, args: &[RespValue]) -> RespValue {
        if !args.is_empty() {
            return wrong_arity("flushdb");
        }
        self.storage.flushdb();
        RespValue::ok()
    }

    // ------------------------------------------------------------------
    // String commands
    // ------------------------------------------------------------------

    /// SET key value [EX seconds | NX]
    fn cmd_set(&self, args: &[RespValue]) -> RespValue {
        if args.len() < 2 {
            return wrong_arity("set");
        }
        let (Some(key), Some(value)) = (arg_bytes(&args[0]), arg_bytes(&args[1])) else {
            return RespValue::error("ERR invalid argument");
        };

        let mut expire_secs: Option<i64> = None;
        let mut nx = false;
        let mut i = 2;
        while i < args.len() {
            let Some(option) = arg_str(&args[i]) else {
                return RespValue::error("ERR syntax error");
            };
            match option.to_uppercase().as_str() {
                "EX" => {
                    i += 1;
                    match args.get(i).and_then(arg_i64) {
                        Some(secs) if secs >= 0 => expire_secs = Some(secs),
                        Some(_) => {
                            return RespValue::error("ERR invalid expire time in 'set' command")
                        }
                        None => return RespValue::error("ERR syntax error"),
                    }
                }
                "NX" => nx = true,
                _ => return RespValue::error("ERR syntax error"),
            }
            i += 1;
        }
        if nx && expire_secs.is_some() {
            // the surface is EX *or* NX; combining them is a syntax error
            return RespValue::error("ERR syntax error");
        }

        if nx {
            if self.storage.setnx(key, value) {
                RespValue::ok()
            } else {
                RespValue::Null
            }
        } else if let Some(secs) = expire_secs {
            self.storage
                .setex(key, value, Duration::from_secs(secs as u64));
            RespValue::ok()
        } else {
            self.storage.set(key, value);
            RespValue::ok()
        }
    }

    /// GET key
    fn cmd_get(&self, args: &[RespValue]) -> RespValue {
        let [key] = args else {
            return wrong_arity("get");
        };
        let Some(key) = arg_bytes(key) else {
            return RespValue::error("ERR invalid argument");
        };
        match self.storage.get(&key) {
            Ok(Some(value)) => RespValue::bulk(value),
            Ok(None) => RespValue::Null,
            Err(e) => store_error(e),
        }
    }

    /// DEL key [key ...]
    fn cmd_del(&self, args: &[RespValue]) -> RespValue {
        if args.is_empty() {
            return wrong_arity("del");
        }
        let mut deleted = 0;
        for arg in args {
            if let Some(key) = arg_bytes(arg) {
                if self.storage.del(&key) {
                    deleted += 1;
                }
            }
        }
        RespValue::integer(deleted)
    }

    /// EXISTS key [key ...]
    fn cmd_exists(&self, args: &[RespValue]) -> RespValue {
        if args.is_empty() {
            return wrong_arity("exists");
        }
        let mut found = 0;
        for arg in args {
            if let Some(key) = arg_bytes(arg) {
                if self.storage.exists(&key) {
                    found += 1;
                }
            }
        }
        RespValue::integer(found)
    }

    /// SETNX key value
    fn cmd_setnx(&self, args: &[RespValue]) -> RespValue {
        let [key, value] = args else {
            return wrong_arity("setnx");
        };
        let (Some(key), Some(value)) = (arg_bytes(key), arg_bytes(value)) else {
            return RespValue::error("ERR invalid argument");
        };
        RespValue::integer(self.storage.setnx(key, value) as i64)
    }

    /// SETEX key seconds value
    fn cmd_setex(&self, args: &[RespValue]) -> RespValue {
        let [key, seconds, value] = args else {
            return wrong_arity("setex");
        };
        let (Some(key), Some(value)) = (arg_bytes(key), arg_bytes(value)) else {
            return RespValue::error("ERR invalid argument");
        };
        let Some(secs) = arg_i64(seconds) else {
            return RespValue::error("ERR value is not an integer or out of range");
        };
        if secs < 0 {
            return RespValue::error("ERR invalid expire time in 'setex' command");
        }
        self.storage
            .setex(key, value, Duration::from_secs(secs as u64));
        RespValue::ok()
    }

    /// EXPIRE key seconds
    fn cmd_expire(&self, args: &[RespValue]) -> RespValue {
        let [key, seconds] = args else {
            return wrong_arity("expire");
        };
        let Some(key) = arg_bytes(key) else {
            return RespValue::error("ERR invalid argument");
        };
        let Some(secs) = arg_i64(seconds) else {
            return RespValue::error("ERR value is not an integer or out of range");
        };
        if secs < 0 {
            return RespValue::error("ERR invalid expire time in 'expire' command");
        }
        let applied = self.storage.expire(&key, Duration::from_secs(secs as u64));
        RespValue::integer(applied as i64)
    }

    /// TTL key
    fn cmd_ttl(&self, args: &[RespValue]) -> RespValue {
        let [key] = args else {
            return wrong_arity("ttl");
        };
        let Some(key) = arg_bytes(key) else {
            return RespValue::error("ERR invalid argument");
        };
        RespValue::integer(self.storage.ttl(&key))
    }

    /// INCR / DECR / INCRBY / DECRBY
    fn cmd_incr_by(&self, args: &[RespValue], sign: i64, takes_delta: bool, name: &str) -> RespValue {
        let (key, delta) = if takes_delta {
            let [key, delta] = args else {
                return wrong_arity(name);
            };
            let Some(delta) = arg_i64(delta) else {
                return RespValue::error("ERR value is not an integer or out of range");
            };
            (key, delta)
        } else {
            let [key] = args else {
                return wrong_arity(name);
            };
            (key, 1)
        };
        let Some(key) = arg_bytes(key) else {
            return RespValue::error("ERR invalid argument");
        };
        let Some(delta) = delta.checked_mul(sign) else {
            return RespValue::error("ERR value is not an integer or out of range");
        };
        match self.storage.incr_by(&key, delta) {
            Ok(n) => RespValue::integer(n),
            Err(e) => store_error(e),
        }
    }

    // ------------------------------------------------------------------
    // Sorted-set commands
    // ------------------------------------------------------------------

    /// ZADD key score member [score member ...]
    fn cmd_zadd(&self, args: &[RespValue]) -> RespValue {
        if args.len() < 3 || (args.len() - 1) % 2 != 0 {
            return wrong_arity("zadd");
        }
        let Some(key) = arg_bytes(&args[0]) else {
            return RespValue::error("ERR invalid argument");
        };

        // validate every pair before the first mutation
        let mut pairs = Vec::with_capacity((args.len() - 1) / 2);
        for chunk in args[1..].chunks_exact(2) {
            let Some(score) = arg_score(&chunk[0]) else {
                return RespValue::error("ERR value is not a valid float");
            };
            let Some(member) = arg_bytes(&chunk[1]) else {
                return RespValue::error("ERR invalid argument");
            };
            pairs.push((score, member));
        }

        let mut added = 0;
        for (score, member) in pairs {
            match self.storage.zadd(key.clone(), member, score) {
                Ok(ZAddOutcome::Added) => added += 1,
                Ok(_) => {}
                Err(e) => return store_error(e),
            }
        }
        RespValue::integer(added)
    }

    /// ZREM key member [member ...]
    fn cmd_zrem(&self, args: &[RespValue]) -> RespValue {
        if args.len() < 2 {
            return wrong_arity("zrem");
        }
        let Some(key) = arg_bytes(&args[0]) else {
            return RespValue::error("ERR invalid argument");
        };
        let mut removed = 0;
        for arg in &args[1..] {
            let Some(member) = arg_bytes(arg) else {
                continue;
            };
            match self.storage.zrem(&key, &member) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => return store_error(e),
            }
        }
        RespValue::integer(removed)
    }

    /// ZSCORE key member
    fn cmd_zscore(&self, args: &[RespValue]) -> RespValue {
        let [key, member] = args else {
            return wrong_arity("zscore");
        };
        let (Some(key), Some(member)) = (arg_bytes(key), arg_bytes(member)) else {
            return RespValue::error("ERR invalid argument");
        };
        match self.storage.zscore(&key, &member) {
            Ok(Some(score)) => RespValue::bulk(format_score(score)),
            Ok(None) => RespValue::Null,
            Err(e) => store_error(e),
        }
    }

    /// ZRANGE key start stop [WITHSCORES]
    fn cmd_zrange(&self, args: &[RespValue]) -> RespValue {
        if args.len() < 3 || args.len() > 4 {
            return wrong_arity("zrange");
        }
        let Some(key) = arg_bytes(&args[0]) else {
            return RespValue::error("ERR invalid argument");
        };
        let (Some(start), Some(stop)) = (arg_i64(&args[1]), arg_i64(&args[2])) else {
            return RespValue::error("ERR value is not an integer or out of range");
        };
        let with_scores = match args.get(3) {
            None => false,
            Some(flag) => match arg_str(flag) {
                Some(s) if s.eq_ignore_ascii_case("WITHSCORES") => true,
                _ => return RespValue::error("ERR syntax error"),
            },
        };

        match self.storage.zrange(&key, start, stop) {
            Ok(members) => member_array(members, with_scores),
            Err(e) => store_error(e),
        }
    }

    /// ZRANGEBYSCORE key min max [WITHSCORES]
    fn cmd_zrangebyscore(&self, args: &[RespValue]) -> RespValue {
        if args.len() < 3 || args.len() > 4 {
            return wrong_arity("zrangebyscore");
        }
        let Some(key) = arg_bytes(&args[0]) else {
            return RespValue::error("ERR invalid argument");
        };
        let (Some(min), Some(max)) = (arg_score(&args[1]), arg_score(&args[2])) else {
            return RespValue::error("ERR min or max is not a float");
        };
        let with_scores = match args.get(3) {
            None => false,
            Some(flag) => match arg_str(flag) {
                Some(s) if s.eq_ignore_ascii_case("WITHSCORES") => true,
                _ => return RespValue::error("ERR syntax error"),
            },
        };

        match self.storage.zrangebyscore(&key, min, max) {
            Ok(members) => member_array(members, with_scores),
            Err(e) => store_error(e),
        }
    }

    /// ZRANK key member
    fn cmd_zrank(&self, args: &[RespValue]) -> RespValue {
        let [key, member] = args else {
            return wrong_arity("zrank");
        };
        let (Some(key), Some(member)) = (arg_bytes(key), arg_bytes(member)) else {
            return RespValue::error("ERR invalid argument");
        };
        match self.storage.zrank(&key, &member) {
            Ok(Some(rank)) => RespValue::integer(rank as i64),
            Ok(None) => RespValue::Null,
            Err(e) => store_error(e),
        }
    }

    /// ZCARD key
    fn cmd_zcard(&self, args: &[RespValue]) -> RespValue {
        let [key] = args else {
            return wrong_arity("zcard");
        };
        let Some(key) = arg_bytes(key) else {
            return RespValue::error("ERR invalid argument");
        };
        match self.storage.zcard(&key) {
            Ok(count) => RespValue::integer(count as i64),
            Err(e) => store_error(e),
        }
    }
}

// ----------------------------------------------------------------------
// Argument extraction and reply helpers
// ----------------------------------------------------------------------

fn arg_bytes(arg: &RespValue) -> Option<Bytes> {
    match arg {
        RespValue::Bulk(b) => Some(b.clone()),
        RespValue::Simple(s) => Some(Bytes::copy_from_slice(s.as_bytes())),
        _ => None,
    }
}

fn arg_str(arg: &RespValue) -> Option<String> {
    match arg {
        RespValue::Bulk(b) => std::str::from_utf8(b).ok().map(str::to_string),
        RespValue::Simple(s) => Some(s.clone()),
        _ => None,
    }
}

fn arg_i64(arg: &RespValue) -> Option<i64> {
    match arg {
        RespValue::Integer(n) => Some(*n),
        _ => arg_str(arg)?.parse().ok(),
    }
}

/// Parses a score. `inf`/`-inf` are valid; NaN is not a score.
fn arg_score(arg: &RespValue) -> Option<f64> {
    let score: f64 = arg_str(arg)?.parse().ok()?;
    if score.is_nan() {
        return None;
    }
    Some(score)
}

/// Uniform score formatting: six-decimal fixed, e.g. `5.000000`.
fn format_score(score: f64) -> String {
    format!("{score:.6}")
}

fn member_array(members: Vec<(Bytes, f64)>, with_scores: bool) -> RespValue {
    let mut out = Vec::with_capacity(members.len() * if with_scores { 2 } else { 1 });
    for (member, score) in members {
        out.push(RespValue::bulk(member));
        if with_scores {
            out.push(RespValue::bulk(format_score(score)));
        }
    }
    RespValue::array(out)
}

fn wrong_arity(command: &str) -> RespValue {
    RespValue::error(format!(
        "ERR wrong number of arguments for '{command}' command"
    ))
}

fn store_error(e: StoreError) -> RespValue {
    match e {
        StoreError::WrongType => RespValue::error(e.to_string()),
        other => RespValue::error(format!("ERR {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> CommandHandler {
        CommandHandler::new(Arc::new(StorageEngine::new()))
    }

    fn run(handler: &CommandHandler, words: &[&str]) -> RespValue {
        let frame = RespValue::Array(
            words
                .iter()
                .map(|w| RespValue::Bulk(Bytes::copy_from_slice(w.as_bytes())))
                .collect(),
        );
        handler.execute(frame)
    }

    #[test]
    fn ping_with_and_without_payload() {
        let h = handler();
        assert_eq!(run(&h, &["PING"]), RespValue::pong());
        assert_eq!(
            run(&h, &["ping", "hello"]),
            RespValue::bulk(Bytes::from("hello"))
        );
    }

    #[test]
    fn set_get_del_round_trip() {
        let h = handler();
        assert_eq!(run(&h, &["SET", "foo", "bar"]), RespValue::ok());
        assert_eq!(
            run(&h, &["GET", "foo"]).to_bytes(),
            Bytes::from("$3\r\nbar\r\n")
        );
        assert_eq!(run(&h, &["DEL", "foo"]), RespValue::integer(1));
        assert_eq!(run(&h, &["GET", "foo"]).to_bytes(), Bytes::from("$-1\r\n"));
    }

    #[test]
    fn verbs_match_case_insensitively() {
        let h = handler();
        assert_eq!(run(&h, &["set", "k", "v"]), RespValue::ok());
        assert_eq!(run(&h, &["GeT", "k"]), RespValue::bulk(Bytes::from("v")));
    }

    #[test]
    fn set_nx_yields_nil_when_key_exists() {
        let h = handler();
        assert_eq!(run(&h, &["SET", "k", "v1", "NX"]), RespValue::ok());
        assert_eq!(run(&h, &["SET", "k", "v2", "nx"]), RespValue::Null);
        assert_eq!(run(&h, &["GET", "k"]), RespValue::bulk(Bytes::from("v1")));
    }

    #[test]
    fn set_with_negative_expire_is_a_range_error() {
        let h = handler();
        let reply = run(&h, &["SET", "k", "v", "EX", "-1"]);
        assert!(reply.is_error());
        assert_eq!(run(&h, &["EXISTS", "k"]), RespValue::integer(0));
    }

    #[test]
    fn set_combining_ex_and_nx_is_rejected() {
        let h = handler();
        assert!(run(&h, &["SET", "k", "v", "EX", "5", "NX"]).is_error());
    }

    #[test]
    fn expire_and_ttl_flow() {
        let h = handler();
        assert_eq!(run(&h, &["EXPIRE", "missing", "10"]), RespValue::integer(0));

        assert_eq!(run(&h, &["SET", "k", "v"]), RespValue::ok());
        assert_eq!(run(&h, &["TTL", "k"]), RespValue::integer(-1));
        assert_eq!(run(&h, &["EXPIRE", "k", "10"]), RespValue::integer(1));
        let RespValue::Integer(ttl) = run(&h, &["TTL", "k"]) else {
            panic!("TTL must reply with an integer");
        };
        assert!((0..=10).contains(&ttl));

        assert_eq!(run(&h, &["TTL", "missing"]), RespValue::integer(-2));
    }

    #[test]
    fn negative_expire_is_rejected() {
        let h = handler();
        run(&h, &["SET", "k", "v"]);
        assert!(run(&h, &["EXPIRE", "k", "-1"]).is_error());
        assert_eq!(run(&h, &["TTL", "k"]), RespValue::integer(-1));
    }

    #[test]
    fn del_and_exists_count_over_many_keys() {
        let h = handler();
        run(&h, &["SET", "a", "1"]);
        run(&h, &["SET", "b", "2"]);
        assert_eq!(run(&h, &["EXISTS", "a", "b", "c"]), RespValue::integer(2));
        assert_eq!(run(&h, &["DEL", "a", "b", "c"]), RespValue::integer(2));
        assert_eq!(run(&h, &["DBSIZE"]), RespValue::integer(0));
    }

    #[test]
    fn setex_and_setnx_commands() {
        let h = handler();
        assert_eq!(run(&h, &["SETEX", "s", "100", "v"]), RespValue::ok());
        let RespValue::Integer(ttl) = run(&h, &["TTL", "s"]) else {
            panic!("TTL must reply with an integer");
        };
        assert!(ttl > 0);

        assert_eq!(run(&h, &["SETNX", "n", "v"]), RespValue::integer(1));
        assert_eq!(run(&h, &["SETNX", "n", "w"]), RespValue::integer(0));
        assert!(run(&h, &["SETEX", "s", "-5", "v"]).is_error());
    }

    #[test]
    fn incr_family() {
        let h = handler();
        assert_eq!(run(&h, &["INCR", "n"]), RespValue::integer(1));
        assert_eq!(run(&h, &["INCRBY", "n", "9"]), RespValue::integer(10));
        assert_eq!(run(&h, &["DECR", "n"]), RespValue::integer(9));
        assert_eq!(run(&h, &["DECRBY", "n", "4"]), RespValue::integer(5));
        assert_eq!(run(&h, &["GET", "n"]), RespValue::bulk(Bytes::from("5")));

        run(&h, &["SET", "t", "abc"]);
        assert!(run(&h, &["INCR", "t"]).is_error());
        assert!(run(&h, &["INCRBY", "n", "x"]).is_error());
    }

    #[test]
    fn flushdb_empties_the_store() {
        let h = handler();
        run(&h, &["SET", "a", "1"]);
        run(&h, &["ZADD", "z", "1", "m"]);
        assert_eq!(run(&h, &["FLUSHDB"]), RespValue::ok());
        assert_eq!(run(&h, &["DBSIZE"]), RespValue::integer(0));
    }

    #[test]
    fn zadd_zrange_zrank_scenario() {
        let h = handler();
        assert_eq!(
            run(&h, &["ZADD", "s", "1", "a", "2", "b", "3", "c"]),
            RespValue::integer(3)
        );
        assert_eq!(
            run(&h, &["ZRANGE", "s", "0", "-1"]).to_bytes(),
            Bytes::from("*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n")
        );
        assert_eq!(
            run(&h, &["ZRANGEBYSCORE", "s", "2", "3"]).to_bytes(),
            Bytes::from("*2\r\n$1\r\nb\r\n$1\r\nc\r\n")
        );
        assert_eq!(run(&h, &["ZRANK", "s", "b"]), RespValue::integer(1));
    }

    #[test]
    fn zadd_update_moves_rank_and_formats_score() {
        let h = handler();
        run(&h, &["ZADD", "s", "1", "a", "2", "b", "3", "c"]);

        // update, not add: reply is 0 and the member moves to the top
        assert_eq!(run(&h, &["ZADD", "s", "5", "a"]), RespValue::integer(0));
        assert_eq!(
            run(&h, &["ZSCORE", "s", "a"]).to_bytes(),
            Bytes::from("$8\r\n5.000000\r\n")
        );
        assert_eq!(run(&h, &["ZRANK", "s", "a"]), RespValue::integer(2));
    }

    #[test]
    fn zadd_nan_leaves_the_set_unchanged() {
        let h = handler();
        run(&h, &["ZADD", "s", "1", "a"]);
        assert!(run(&h, &["ZADD", "s", "nan", "x"]).is_error());
        // a NaN in a later pair must also protect earlier pairs
        assert!(run(&h, &["ZADD", "s", "2", "b", "nan", "x"]).is_error());
        assert_eq!(run(&h, &["ZCARD", "s"]), RespValue::integer(1));
    }

    #[test]
    fn zadd_odd_pair_count_is_an_arity_error() {
        let h = handler();
        assert!(run(&h, &["ZADD", "s", "1", "a", "2"]).is_error());
        assert!(run(&h, &["ZADD", "s"]).is_error());
    }

    #[test]
    fn zrem_counts_removed_members() {
        let h = handler();
        run(&h, &["ZADD", "s", "1", "a", "2", "b"]);
        assert_eq!(run(&h, &["ZREM", "s", "a", "zz"]), RespValue::integer(1));
        assert_eq!(run(&h, &["ZCARD", "s"]), RespValue::integer(1));
        assert_eq!(run(&h, &["ZREM", "missing", "a"]), RespValue::integer(0));
    }

    #[test]
    fn zscore_and_zrank_on_missing_member_are_nil() {
        let h = handler();
        run(&h, &["ZADD", "s", "1", "a"]);
        assert_eq!(run(&h, &["ZSCORE", "s", "ghost"]), RespValue::Null);
        assert_eq!(run(&h, &["ZRANK", "s", "ghost"]), RespValue::Null);
        assert_eq!(run(&h, &["ZSCORE", "missing", "a"]), RespValue::Null);
    }

    #[test]
    fn zrange_withscores_interleaves() {
        let h = handler();
        run(&h, &["ZADD", "s", "1", "a", "2", "b"]);
        let reply = run(&h, &["ZRANGE", "s", "0", "-1", "WITHSCORES"]);
        assert_eq!(
            reply,
            RespValue::array(vec![
                RespValue::bulk(Bytes::from("a")),
                RespValue::bulk(Bytes::from("1.000000")),
                RespValue::bulk(Bytes::from("b")),
                RespValue::bulk(Bytes::from("2.000000")),
            ])
        );
        // the option token is case-insensitive
        let reply = run(&h, &["ZRANGEBYSCORE", "s", "1", "2", "withscores"]);
        let RespValue::Array(items) = reply else {
            panic!("expected an array reply");
        };
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn zrangebyscore_accepts_infinities() {
        let h = handler();
        run(&h, &["ZADD", "s", "1", "a", "2", "b"]);
        let reply = run(&h, &["ZRANGEBYSCORE", "s", "-inf", "+inf"]);
        let RespValue::Array(items) = reply else {
            panic!("expected an array reply");
        };
        assert_eq!(items.len(), 2);
        assert!(run(&h, &["ZRANGEBYSCORE", "s", "nan", "2"]).is_error());
    }

    #[test]
    fn zset_commands_on_string_key_report_wrongtype() {
        let h = handler();
        run(&h, &["SET", "k", "v"]);
        let reply = run(&h, &["ZADD", "k", "1", "m"]);
        let RespValue::Error(message) = reply else {
            panic!("expected an error reply");
        };
        assert!(message.starts_with("WRONGTYPE"));
        assert!(run(&h, &["ZCARD", "k"]).is_error());
        assert!(run(&h, &["GET", "k"]) == RespValue::bulk(Bytes::from("v")));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let h = handler();
        assert!(run(&h, &["NOSUCH"]).is_error());
    }

    #[test]
    fn empty_request_is_an_error() {
        let h = handler();
        assert!(h.execute(RespValue::Array(Vec::new())).is_error());
        assert!(h.execute(RespValue::integer(3)).is_error());
    }
}
