//! Stream and input/output predicates
//!
//! Streams are addressed by handle or alias. Output goes through the writer
//! with this machine's operator table; input reads one clause's worth of
//! text and hands it to the reader. Writes and reads are side effects in
//! execution order and are never undone by backtracking.

use super::super::exception::{
    domain_error, existence_error, instantiation_error, permission_error, type_error, Exception,
};
use super::super::promise::{Cont, Promise, Thunk};
use super::super::resolve_stream;
use super::super::streams::{stream_term, StreamMode};
use super::super::term::Term;
use super::super::Machine;
use super::{det, proper_list, unify_cont};
use crate::reader::{self, ReadContext};
use crate::writer::{self, WriteOptions};

pub(super) fn register(m: &mut Machine) {
    m.register("current_input", 1, |m, args, k| {
        let t = stream_term(m.streams.current_input());
        unify_cont(m, &args[0], &t, k)
    });
    m.register("current_output", 1, |m, args, k| {
        let t = stream_term(m.streams.current_output());
        unify_cont(m, &args[0], &t, k)
    });

    m.register("set_input", 1, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        if !m.streams.get(id).is_some_and(|s| s.is_input()) {
            return Promise::error(permission_error(
                "input",
                "stream",
                m.env.resolve(&args[0]),
                &m.env,
            ));
        }
        m.streams.set_current_input(id);
        det(k)
    });
    m.register("set_output", 1, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        if !m.streams.get(id).is_some_and(|s| s.is_output()) {
            return Promise::error(permission_error(
                "output",
                "stream",
                m.env.resolve(&args[0]),
                &m.env,
            ));
        }
        m.streams.set_current_output(id);
        det(k)
    });

    m.register("open", 3, |m, args, k| {
        open_stream(m, &args[0], &args[1], &args[2], &Term::nil(), k)
    });
    m.register("open", 4, |m, args, k| {
        open_stream(m, &args[0], &args[1], &args[2], &args[3], k)
    });

    m.register("close", 1, |m, args, k| close_stream(m, &args[0], k));
    m.register("close", 2, |m, args, k| {
        // close options (force/1) change nothing we can fail at
        if let Err(e) = proper_list(&args[1], &m.env) {
            return Promise::error(e);
        }
        close_stream(m, &args[0], k)
    });

    m.register("flush_output", 0, |m, _, k| {
        let id = m.streams.current_output();
        if let Some(s) = m.streams.get_mut(id) {
            let _ = s.flush();
        }
        det(k)
    });
    m.register("flush_output", 1, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        if let Some(s) = m.streams.get_mut(id) {
            let _ = s.flush();
        }
        det(k)
    });

    m.register("write", 1, |m, args, k| {
        let id = m.streams.current_output();
        write_out(m, id, &args[0], WriteOptions { quoted: false, ignore_ops: false, numbervars: true }, k)
    });
    m.register("write", 2, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        write_out(m, id, &args[1], WriteOptions { quoted: false, ignore_ops: false, numbervars: true }, k)
    });
    m.register("writeq", 1, |m, args, k| {
        let id = m.streams.current_output();
        write_out(m, id, &args[0], WriteOptions::quoted(), k)
    });
    m.register("writeq", 2, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        write_out(m, id, &args[1], WriteOptions::quoted(), k)
    });
    m.register("write_canonical", 1, |m, args, k| {
        let id = m.streams.current_output();
        write_out(m, id, &args[0], WriteOptions::canonical(), k)
    });
    m.register("write_canonical", 2, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        write_out(m, id, &args[1], WriteOptions::canonical(), k)
    });

    m.register("write_term", 2, |m, args, k| {
        let id = m.streams.current_output();
        match write_options(m, &args[1]) {
            Ok(opts) => write_out(m, id, &args[0], opts, k),
            Err(e) => Promise::error(e),
        }
    });
    m.register("write_term", 3, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        match write_options(m, &args[2]) {
            Ok(opts) => write_out(m, id, &args[1], opts, k),
            Err(e) => Promise::error(e),
        }
    });

    m.register("nl", 0, |m, _, k| {
        let id = m.streams.current_output();
        put_text(m, id, "\n", k)
    });
    m.register("nl", 1, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        put_text(m, id, "\n", k)
    });

    m.register("put_char", 1, |m, args, k| {
        let id = m.streams.current_output();
        put_char(m, id, &args[0], k)
    });
    m.register("put_char", 2, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        put_char(m, id, &args[1], k)
    });

    m.register("get_char", 1, |m, args, k| {
        let id = m.streams.current_input();
        get_char(m, id, &args[0], k, false)
    });
    m.register("get_char", 2, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        get_char(m, id, &args[1], k, false)
    });
    m.register("peek_char", 1, |m, args, k| {
        let id = m.streams.current_input();
        get_char(m, id, &args[0], k, true)
    });
    m.register("peek_char", 2, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        get_char(m, id, &args[1], k, true)
    });

    m.register("read", 1, |m, args, k| {
        let id = m.streams.current_input();
        read_in(m, id, &args[0], k)
    });
    m.register("read", 2, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        read_in(m, id, &args[1], k)
    });
    m.register("read_term", 2, |m, args, k| {
        let id = m.streams.current_input();
        // read options carry no information the engine tracks
        if let Err(e) = proper_list(&args[1], &m.env) {
            return Promise::error(e);
        }
        read_in(m, id, &args[0], k)
    });
    m.register("read_term", 3, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        if let Err(e) = proper_list(&args[2], &m.env) {
            return Promise::error(e);
        }
        read_in(m, id, &args[1], k)
    });

    m.register("at_end_of_stream", 0, |m, _, k| {
        let id = m.streams.current_input();
        at_end(m, id, k)
    });
    m.register("at_end_of_stream", 1, |m, args, k| {
        let id = match resolve_stream(m, &args[0]) {
            Ok(id) => id,
            Err(e) => return Promise::error(e),
        };
        at_end(m, id, k)
    });

    m.register("stream_property", 2, |m, args, k| {
        let ids = match m.env.resolve(&args[0]) {
            Term::Variable(_) => m.streams.ids(),
            t => match resolve_stream(m, &t) {
                Ok(id) => vec![id],
                Err(e) => return Promise::error(e),
            },
        };
        let mut alts: Vec<Thunk> = Vec::new();
        for id in ids {
            let props = stream_properties(m, id);
            for prop in props {
                let stream = stream_term(id);
                let want = Term::compound("-", vec![args[0].clone(), args[1].clone()]);
                let k = k.clone();
                alts.push(Box::new(move |m: &mut Machine| {
                    let have = Term::compound("-", vec![stream.clone(), prop.clone()]);
                    unify_cont(m, &want, &have, k.clone())
                }));
            }
        }
        Promise::delay_all(alts)
    });
}

fn open_stream(
    m: &mut Machine,
    source: &Term,
    mode: &Term,
    stream: &Term,
    options: &Term,
    k: Cont,
) -> Promise {
    let path = match m.env.resolve(source) {
        Term::Variable(_) => return Promise::error(instantiation_error()),
        Term::Atom(a) => a.as_str().to_string(),
        other => return Promise::error(domain_error("source_sink", other, &m.env)),
    };
    let mode = match m.env.resolve(mode) {
        Term::Variable(_) => return Promise::error(instantiation_error()),
        Term::Atom(a) if a == "read" => StreamMode::Read,
        Term::Atom(a) if a == "write" => StreamMode::Write,
        Term::Atom(a) if a == "append" => StreamMode::Append,
        other => return Promise::error(domain_error("io_mode", other, &m.env)),
    };
    if !matches!(m.env.resolve(stream), Term::Variable(_)) {
        return Promise::error(instantiation_error());
    }
    let mut alias = None;
    let opts = match proper_list(options, &m.env) {
        Ok(v) => v,
        Err(e) => return Promise::error(e),
    };
    for opt in &opts {
        let opt = m.env.resolve(opt);
        if let Some(c) = opt.as_functor("alias", 1) {
            match m.env.resolve(&c.args[0]) {
                Term::Atom(a) => alias = Some(a),
                other => return Promise::error(domain_error("stream_option", other, &m.env)),
            }
        } else if opt.as_functor("type", 1).is_some()
            || opt.as_functor("eof_action", 1).is_some()
            || opt.as_functor("reposition", 1).is_some()
        {
            // accepted and recorded by the stream defaults
        } else {
            return Promise::error(domain_error("stream_option", opt, &m.env));
        }
    }
    match m.streams.open(&path, mode, alias) {
        Ok(id) => {
            let t = stream_term(id);
            unify_cont(m, stream, &t, k)
        }
        Err(_) => Promise::error(existence_error("source_sink", Term::atom(&path), &m.env)),
    }
}

fn close_stream(m: &mut Machine, t: &Term, k: Cont) -> Promise {
    let id = match resolve_stream(m, t) {
        Ok(id) => id,
        Err(e) => return Promise::error(e),
    };
    let _ = m.streams.close(id);
    det(k)
}

fn write_out(m: &mut Machine, id: u64, t: &Term, opts: WriteOptions, k: Cont) -> Promise {
    let text = writer::to_string(t, &m.env, opts, Some(&m.operators));
    put_text(m, id, &text, k)
}

fn put_text(m: &mut Machine, id: u64, text: &str, k: Cont) -> Promise {
    let Some(s) = m.streams.get_mut(id) else {
        return Promise::error(existence_error("stream", stream_term(id), &m.env));
    };
    if !s.is_output() {
        return Promise::error(permission_error("output", "stream", stream_term(id), &m.env));
    }
    match s.write_str(text) {
        Ok(()) => det(k),
        Err(e) => Promise::error(super::super::exception::system_error(e)),
    }
}

fn put_char(m: &mut Machine, id: u64, c: &Term, k: Cont) -> Promise {
    match m.env.resolve(c) {
        Term::Variable(_) => Promise::error(instantiation_error()),
        Term::Atom(a) if a.as_str().chars().count() == 1 => {
            let text = a.as_str().to_string();
            put_text(m, id, &text, k)
        }
        other => Promise::error(type_error("character", other, &m.env)),
    }
}

fn get_char(m: &mut Machine, id: u64, out: &Term, k: Cont, peek: bool) -> Promise {
    let Some(s) = m.streams.get_mut(id) else {
        return Promise::error(existence_error("stream", stream_term(id), &m.env));
    };
    if !s.is_input() {
        return Promise::error(permission_error("input", "stream", stream_term(id), &m.env));
    }
    let got = if peek { s.peek_char() } else { s.read_char() };
    match got {
        Ok(Some(c)) => {
            let t = Term::atom(&c.to_string());
            unify_cont(m, out, &t, k)
        }
        Ok(None) => unify_cont(m, out, &Term::atom("end_of_file"), k),
        Err(e) => Promise::error(super::super::exception::system_error(e)),
    }
}

fn at_end(m: &mut Machine, id: u64, k: Cont) -> Promise {
    let Some(s) = m.streams.get_mut(id) else {
        return Promise::error(existence_error("stream", stream_term(id), &m.env));
    };
    match s.end_of_stream() {
        "at" | "past" => det(k),
        _ => Promise::bool(false),
    }
}

/// Read one clause's worth of characters and parse it; `end_of_file` at
/// exhaustion.
fn read_in(m: &mut Machine, id: u64, out: &Term, k: Cont) -> Promise {
    let text = {
        let Some(s) = m.streams.get_mut(id) else {
            return Promise::error(existence_error("stream", stream_term(id), &m.env));
        };
        if !s.is_input() {
            return Promise::error(permission_error("input", "stream", stream_term(id), &m.env));
        }
        match collect_clause_text(s) {
            Ok(t) => t,
            Err(e) => return Promise::error(super::super::exception::system_error(e)),
        }
    };
    let Some(text) = text else {
        return unify_cont(m, out, &Term::atom("end_of_file"), k);
    };
    let ctx = ReadContext {
        ops: &m.operators,
        double_quotes: m.flags.double_quotes,
        char_conversion: if m.flags.char_conversion { Some(&m.char_conversions) } else { None },
    };
    match reader::read_term(&text, 0, &ctx) {
        Ok(Some(r)) => {
            let t = r.term;
            unify_cont(m, out, &t, k)
        }
        Ok(None) => unify_cont(m, out, &Term::atom("end_of_file"), k),
        Err(e) => Promise::error(e),
    }
}

/// Scan characters up to an unquoted clause terminator (`.` followed by
/// layout or end), tracking quotes and comments the way the tokenizer does.
fn collect_clause_text(
    s: &mut super::super::streams::Stream,
) -> Result<Option<String>, std::io::Error> {
    let mut text = String::new();
    let mut quote: Option<char> = None;
    let mut in_line_comment = false;
    let mut in_block_comment = false;
    let mut escaped = false;
    loop {
        let Some(c) = s.read_char()? else {
            if text.trim().is_empty() {
                return Ok(None);
            }
            return Ok(Some(text));
        };
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
            text.push(c);
            continue;
        }
        if in_block_comment {
            text.push(c);
            if c == '/' && text.ends_with("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if let Some(q) = quote {
            text.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '%' => in_line_comment = true,
            '\'' | '"' | '`' => quote = Some(c),
            '*' if text.ends_with('/') => in_block_comment = true,
            '.' => {
                // terminator iff followed by layout or end of stream
                match s.peek_char()? {
                    None => {
                        text.push('.');
                        return Ok(Some(text));
                    }
                    Some(next) if next.is_whitespace() || next == '%' => {
                        text.push('.');
                        return Ok(Some(text));
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        text.push(c);
    }
}

fn write_options(m: &Machine, t: &Term) -> Result<WriteOptions, Exception> {
    let mut opts = WriteOptions::default();
    for opt in proper_list(t, &m.env)? {
        let opt = m.env.resolve(&opt);
        if let Some(c) = opt.as_functor("quoted", 1) {
            opts.quoted = option_bool(m, &c.args[0], &opt)?;
        } else if let Some(c) = opt.as_functor("ignore_ops", 1) {
            opts.ignore_ops = option_bool(m, &c.args[0], &opt)?;
        } else if let Some(c) = opt.as_functor("numbervars", 1) {
            opts.numbervars = option_bool(m, &c.args[0], &opt)?;
        } else {
            return Err(domain_error("write_option", opt, &m.env));
        }
    }
    Ok(opts)
}

fn option_bool(m: &Machine, value: &Term, whole: &Term) -> Result<bool, Exception> {
    match m.env.resolve(value) {
        Term::Atom(a) if a == "true" => Ok(true),
        Term::Atom(a) if a == "false" => Ok(false),
        _ => Err(domain_error("write_option", whole.clone(), &m.env)),
    }
}

fn stream_properties(m: &mut Machine, id: u64) -> Vec<Term> {
    let Some(s) = m.streams.get_mut(id) else {
        return Vec::new();
    };
    let mut props = Vec::new();
    if s.is_input() {
        props.push(Term::atom("input"));
    }
    if s.is_output() {
        props.push(Term::atom("output"));
    }
    props.push(Term::compound("mode", vec![Term::atom(s.mode.name())]));
    if let Some(a) = s.alias {
        props.push(Term::compound("alias", vec![Term::Atom(a)]));
    }
    props.push(Term::compound("eof_action", vec![Term::atom(s.eof_action.name())]));
    if let Some(f) = s.file_name.clone() {
        props.push(Term::compound("file_name", vec![Term::atom(&f)]));
    }
    props.push(Term::compound("position", vec![Term::Integer(s.position() as i64)]));
    if s.is_input() {
        let eos = s.end_of_stream();
        props.push(Term::compound("end_of_stream", vec![Term::atom(eos)]));
    }
    let repo = if s.reposition { "true" } else { "false" };
    props.push(Term::compound("reposition", vec![Term::atom(repo)]));
    // the type property carries the atom, never a boolean
    props.push(Term::compound("type", vec![Term::atom(s.typ.name())]));
    props.push(Term::compound("buffer", vec![Term::atom("full")]));
    props
}
