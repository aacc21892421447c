use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};

use crate::error::{PlannerError, Result};
use crate::orbital::{BodyOrbit, BodyRegistry, CelestialBody};

// ---------------------------------------------------------------------------
// Brace-structured config tree
// ---------------------------------------------------------------------------

/// A `NAME { ... }` block: `key = value` pairs and nested blocks, in file
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfgNode {
    pub line: usize,
    pub values: Vec<(String, String)>,
    pub children: Vec<(String, CfgNode)>,
}

impl CfgNode {
    /// First value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&CfgNode> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Every block called `name`, at any depth.
    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a CfgNode>) {
        for (n, child) in &self.children {
            if n == name {
                out.push(child);
            }
            child.find_all(name, out);
        }
    }

    fn number(&self, key: &str) -> Result<Option<f64>> {
        match self.value(key) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| PlannerError::Cfg {
                line: self.line,
                msg: format!("{} = {:?} is not a number", key, v),
            }),
        }
    }

    fn required(&self, key: &str) -> Result<f64> {
        self.number(key)?.ok_or_else(|| PlannerError::Cfg { line: self.line, msg: format!("missing {}", key) })
    }
}

/// Parse the config text. `//` starts a comment; a bare word names the
/// block opened by the following `{`.
pub fn parse<R: BufRead>(reader: R) -> Result<CfgNode> {
    let mut stack: Vec<(String, CfgNode)> = Vec::new();
    let mut current = CfgNode { line: 0, ..CfgNode::default() };
    let mut last: Option<String> = None;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let line = line.split("//").next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        if let Some((k, v)) = line.split_once('=') {
            current.values.push((k.trim().to_string(), v.trim().to_string()));
            continue;
        }
        match line {
            "{" => {
                let name = last.take().ok_or(PlannerError::Cfg { line: line_no, msg: "block without a name".into() })?;
                let parent = std::mem::replace(&mut current, CfgNode { line: line_no, ..CfgNode::default() });
                stack.push((name, parent));
            }
            "}" => {
                let (name, mut parent) = stack.pop().ok_or(PlannerError::Cfg { line: line_no, msg: "unmatched }".into() })?;
                let block = std::mem::take(&mut current);
                parent.children.push((name, block));
                current = parent;
                last = None;
            }
            word => last = Some(word.to_string()),
        }
    }

    if let Some((name, _)) = stack.last() {
        return Err(PlannerError::Cfg { line: current.line, msg: format!("unclosed block {}", name) });
    }
    Ok(current)
}

// ---------------------------------------------------------------------------
// Celestial bodies
// ---------------------------------------------------------------------------

fn body_from_node(node: &CfgNode) -> Result<CelestialBody> {
    let name = node
        .value("name")
        .ok_or(PlannerError::Cfg { line: node.line, msg: "BODY without a name".into() })?
        .to_string();

    let orbit = match node.child("ORBIT") {
        None => None,
        Some(o) => Some(BodyOrbit {
            sma: o.required("semiMajorAxis")?,
            ecc: o.number("eccentricity")?.unwrap_or(0.0),
            inc: o.number("inclination")?.unwrap_or(0.0).to_radians(),
            lan: o.number("LAN")?.unwrap_or(0.0).to_radians(),
            argp: o.number("argumentOfPeriapsis")?.unwrap_or(0.0).to_radians(),
            mean_anom_epoch: o.number("meanAnomalyAtEpoch")?.unwrap_or(0.0),
            epoch: o.number("epoch")?.unwrap_or(0.0),
        }),
    };

    Ok(CelestialBody {
        radius: node.required("radius")?,
        mu: node.required("gravParameter")?,
        parent: node.value("referenceBody").map(str::to_string),
        soi: node.number("sphereOfInfluence")?,
        orbit,
        name,
    })
}

/// Build a registry from every `BODY` block in a parsed tree.
pub fn bodies_from(tree: &CfgNode) -> Result<BodyRegistry> {
    let mut nodes = Vec::new();
    tree.find_all("BODY", &mut nodes);

    let bodies = nodes.into_iter().map(body_from_node).collect::<Result<Vec<_>>>()?;
    for body in &bodies {
        if let Some(parent) = &body.parent {
            if !bodies.iter().any(|b| &b.name == parent) {
                warn!("body {} orbits unknown body {}", body.name, parent);
            }
        }
    }
    debug!("loaded {} bodies", bodies.len());
    Ok(BodyRegistry::from_bodies(bodies))
}

pub fn load_bodies(path: impl AsRef<Path>) -> Result<BodyRegistry> {
    let tree = parse(BufReader::new(File::open(path)?))?;
    bodies_from(&tree)
}
