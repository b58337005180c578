// src/model/structure.rs

use crate::error::{Error, Result};
use crate::utils::linalg::frac_to_cart;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structure payload referenced by a container's `data-json` attribute.
///
/// Only `lattice.matrix` and `sites[].{element, xyz}` are read; anything else
/// (pymatgen dictionaries carry charge, species, properties...) is ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureDocument {
    pub lattice: Lattice,
    pub sites: Vec<Site>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    // Rows are the basis vectors a, b, c
    pub matrix: Vec<[f64; 3]>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    pub xyz: [f64; 3],
}

impl Site {
    /// Element label, or `placeholder` when missing or empty.
    pub fn symbol<'a>(&'a self, placeholder: &'a str) -> &'a str {
        match self.element.as_deref() {
            Some(el) if !el.is_empty() => el,
            _ => placeholder,
        }
    }
}

impl StructureDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The three lattice vectors; anything other than exactly three is rejected.
    pub fn lattice_vectors(&self) -> Result<[[f64; 3]; 3]> {
        match self.lattice.matrix.as_slice() {
            [a, b, c] => Ok([*a, *b, *c]),
            other => Err(Error::InvalidStructure(format!(
                "lattice matrix must have 3 vectors, got {}",
                other.len()
            ))),
        }
    }

    /// Builds a document from parser output.
    ///
    /// Under `results.properties.structure`, a `pymatgen_structure` dictionary
    /// wins. Otherwise `lattice_vectors`, `species_at_sites` and either
    /// `cartesian_site_positions` or `fractional_site_positions` are read.
    pub fn from_parsed_output(parsed: &Value) -> Result<Self> {
        let structure = parsed
            .pointer("/results/properties/structure")
            .ok_or_else(|| Error::InvalidStructure("no results.properties.structure".into()))?;

        if let Some(pmg) = structure.get("pymatgen_structure").filter(|v| !v.is_null()) {
            return Self::from_pymatgen(pmg);
        }

        let lattice: [[f64; 3]; 3] = field(structure, "lattice_vectors")?;
        let species: Vec<String> = field(structure, "species_at_sites")?;

        let positions: Vec<[f64; 3]> = if structure.get("cartesian_site_positions").is_some() {
            field(structure, "cartesian_site_positions")?
        } else {
            let frac: Vec<[f64; 3]> = field(structure, "fractional_site_positions")
                .map_err(|_| Error::InvalidStructure("no site positions".into()))?;
            frac.into_iter().map(|f| frac_to_cart(f, lattice)).collect()
        };

        if species.len() != positions.len() {
            return Err(Error::InvalidStructure(format!(
                "{} species for {} positions",
                species.len(),
                positions.len()
            )));
        }

        let sites = species
            .into_iter()
            .zip(positions)
            .map(|(element, xyz)| Site { element: Some(element), xyz })
            .collect();

        Ok(Self {
            lattice: Lattice { matrix: lattice.to_vec() },
            sites,
        })
    }

    /// Reads a pymatgen `Structure.as_dict()` payload. The element comes from
    /// the first species entry (or the label); `xyz` is used when present,
    /// `abc` otherwise.
    pub fn from_pymatgen(value: &Value) -> Result<Self> {
        let lattice_value = value
            .get("lattice")
            .ok_or_else(|| Error::InvalidStructure("missing lattice".into()))?;
        let lattice: [[f64; 3]; 3] = field(lattice_value, "matrix")?;

        let raw_sites = value
            .get("sites")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidStructure("missing sites".into()))?;

        let mut sites = Vec::with_capacity(raw_sites.len());
        for site in raw_sites {
            let element = site
                .pointer("/species/0/element")
                .or_else(|| site.get("label"))
                .and_then(Value::as_str)
                .map(String::from);
            let xyz = if site.get("xyz").is_some() {
                field(site, "xyz")?
            } else {
                frac_to_cart(field(site, "abc")?, lattice)
            };
            sites.push(Site { element, xyz });
        }

        Ok(Self {
            lattice: Lattice { matrix: lattice.to_vec() },
            sites,
        })
    }
}

fn field<T: serde::de::DeserializeOwned>(obj: &Value, key: &str) -> Result<T> {
    let value = obj
        .get(key)
        .ok_or_else(|| Error::InvalidStructure(format!("missing {}", key)))?;
    serde_json::from_value(value.clone())
        .map_err(|e| Error::InvalidStructure(format!("bad {}: {}", key, e)))
}
