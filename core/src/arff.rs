use crate::classify::{Dataset, Instance};
use crate::error::ClassifyError;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

fn quote(name: &str) -> String {
    format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
}

pub fn write_dataset<W: Write>(mut w: W, data: &Dataset) -> std::io::Result<()> {
    writeln!(w, "@relation {}", quote(&data.relation))?;
    writeln!(w)?;
    for attribute in &data.attributes {
        writeln!(w, "@attribute {} {{0,1}}", quote(attribute))?;
    }
    let classes: Vec<String> = data.classes.iter().map(|c| quote(c)).collect();
    writeln!(w, "@attribute class {{{}}}", classes.join(","))?;
    writeln!(w)?;
    writeln!(w, "@data")?;
    for instance in &data.instances {
        for value in &instance.values {
            w.write_all(if *value { b"1," } else { b"0," })?;
        }
        writeln!(w, "{}", classes[instance.class])?;
    }
    w.flush()
}

pub fn save_dataset<P: AsRef<Path>>(path: P, data: &Dataset) -> Result<(), ClassifyError> {
    if let Some(dir) = path.as_ref().parent() {
        create_dir_all(dir)?;
    }
    let f = File::create(path)?;
    write_dataset(BufWriter::new(f), data)?;
    Ok(())
}

pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset, ClassifyError> {
    let f = File::open(path)?;
    read_dataset(BufReader::new(f))
}

/// Reads back what [`write_dataset`] produces: nominal `{0,1}` term
/// attributes, one nominal class attribute last, dense rows.
pub fn read_dataset<R: BufRead>(r: R) -> Result<Dataset, ClassifyError> {
    let mut relation = String::new();
    let mut declared: Vec<(String, Vec<String>)> = Vec::new();
    let mut in_data = false;
    let mut attributes: Vec<String> = Vec::new();
    let mut classes: Vec<String> = Vec::new();
    let mut instances = Vec::new();

    for (n, line) in r.lines().enumerate() {
        let line = line?;
        let line_no = n + 1;
        let err = |message: String| ClassifyError::Arff { line: line_no, message };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }

        if in_data {
            let fields = split_fields(trimmed).map_err(err)?;
            if fields.len() != attributes.len() + 1 {
                return Err(err(format!("expected {} fields, found {}", attributes.len() + 1, fields.len())));
            }
            let (label, values) = fields.split_last().ok_or_else(|| err("empty row".into()))?;
            let values = values
                .iter()
                .map(|v| match v.as_str() {
                    "1" => Ok(true),
                    "0" => Ok(false),
                    other => Err(err(format!("value `{other}` is not 0 or 1"))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let class = classes
                .iter()
                .position(|c| c == label)
                .ok_or_else(|| err(format!("unknown class `{label}`")))?;
            instances.push(Instance { values, class });
            continue;
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("@relation") {
            let (name, _) = next_token(trimmed["@relation".len()..].trim_start()).map_err(err)?;
            relation = name;
        } else if lower.starts_with("@attribute") {
            let (name, rest) = next_token(trimmed["@attribute".len()..].trim_start()).map_err(err)?;
            let kind = rest.trim();
            let values = kind
                .strip_prefix('{')
                .and_then(|k| k.strip_suffix('}'))
                .ok_or_else(|| err(format!("attribute `{name}` is not nominal")))?;
            declared.push((name, split_fields(values).map_err(err)?));
        } else if lower.starts_with("@data") {
            let (class_attr, labels) = declared.pop().ok_or_else(|| err("no class attribute".into()))?;
            tracing::debug!(class_attribute = %class_attr, attributes = declared.len(), "reading arff data");
            attributes = declared.drain(..).map(|(name, _)| name).collect();
            classes = labels;
            in_data = true;
        } else {
            return Err(err(format!("unexpected line `{trimmed}`")));
        }
    }

    if !in_data {
        return Err(ClassifyError::Arff { line: 0, message: "missing @data section".into() });
    }
    Ok(Dataset { relation, attributes, classes, instances })
}

/// Leading quoted or bare token and the remaining text.
fn next_token(s: &str) -> Result<(String, &str), String> {
    if let Some(rest) = s.strip_prefix('\'') {
        let mut out = String::new();
        let mut chars = rest.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => return Err("dangling escape".into()),
                },
                '\'' => return Ok((out, &rest[i + 1..])),
                c => out.push(c),
            }
        }
        Err("unterminated quote".into())
    } else {
        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        if end == 0 {
            return Err("missing name".into());
        }
        Ok((s[..end].to_string(), &s[end..]))
    }
}

/// Comma-separated values, quotes honoured.
fn split_fields(s: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut rest = s.trim();
    while !rest.is_empty() {
        if rest.starts_with('\'') {
            let (field, after) = next_token(rest)?;
            fields.push(field);
            rest = after.trim_start();
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            fields.push(rest[..end].trim().to_string());
            rest = &rest[end..];
        }
        match rest.strip_prefix(',') {
            Some(after) => rest = after.trim_start(),
            None if rest.is_empty() => {}
            None => return Err(format!("expected `,` before `{rest}`")),
        }
    }
    Ok(fields)
}
