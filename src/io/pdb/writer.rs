use crate::io::error::Error;
use crate::model::{
    assembly::Assembly, atom::Atom, residue::Residue, topology::Topology, types::Point,
};
use std::collections::BTreeMap;
use std::io::Write;

const FORMAT: &str = "PDB";

/// Writes the assembly as ATOM/HETATM records, one MODEL block per coordinate set when
/// there is more than one.
pub fn write_structure<W: Write>(writer: W, assembly: &Assembly) -> Result<(), Error> {
    let mut ctx = WriterContext::new(writer);
    ctx.write_header(assembly)?;
    ctx.write_models(assembly)?;
    ctx.write_end()
}

/// Like [`write_structure`], followed by one `CONECT` block per bonded atom.
pub fn write_topology<W: Write>(writer: W, topology: &Topology) -> Result<(), Error> {
    let mut ctx = WriterContext::new(writer);
    let assembly = topology.assembly();
    ctx.write_header(assembly)?;
    ctx.write_models(assembly)?;
    ctx.write_connects(topology)?;
    ctx.write_end()
}

struct WriterContext<W> {
    writer: W,
    atom_serials: Vec<usize>,
}

impl<W: Write> WriterContext<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            atom_serials: Vec::new(),
        }
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) -> Result<(), Error> {
        writeln!(self.writer, "{args}").map_err(|e| Error::from_io(e, None))
    }

    fn write_header(&mut self, assembly: &Assembly) -> Result<(), Error> {
        if !assembly.name.is_empty() {
            self.line(format_args!("TITLE     {}", assembly.name))?;
        }
        if let Some(vectors) = assembly.box_vectors {
            let v1 = nalgebra::Vector3::from(vectors[0]);
            let v2 = nalgebra::Vector3::from(vectors[1]);
            let v3 = nalgebra::Vector3::from(vectors[2]);

            self.line(format_args!(
                "CRYST1{:9.3}{:9.3}{:9.3}{:7.2}{:7.2}{:7.2} P 1           1",
                v1.norm(),
                v2.norm(),
                v3.norm(),
                v2.angle(&v3).to_degrees(),
                v1.angle(&v3).to_degrees(),
                v1.angle(&v2).to_degrees()
            ))?;
        }
        Ok(())
    }

    fn write_models(&mut self, assembly: &Assembly) -> Result<(), Error> {
        let models = assembly.model_count().max(1);
        for model in 0..models {
            if models > 1 {
                self.line(format_args!("MODEL     {:4}", model + 1))?;
            }
            self.write_atoms(assembly, model)?;
            if models > 1 {
                self.line(format_args!("ENDMDL"))?;
            }
        }
        Ok(())
    }

    fn write_atoms(&mut self, assembly: &Assembly, model: usize) -> Result<(), Error> {
        let mut serial = 1;
        let mut serials = Vec::with_capacity(assembly.atom_count());
        let residues: Vec<&Residue> = assembly.iter_residues().collect();

        for (res_idx, residue) in residues.iter().enumerate() {
            let record = if residue.kind.is_polymer() {
                "ATOM  "
            } else {
                "HETATM"
            };

            for atom in residue.iter_atoms() {
                let pos = atom.position(model).unwrap_or_else(|| atom.pos());
                serials.push(serial);
                self.write_atom_record(record, serial, atom, pos, residue)?;
                serial += 1;
            }

            let chain_ends = residues
                .get(res_idx + 1)
                .is_none_or(|next| next.chain_id != residue.chain_id || !next.kind.is_polymer());
            if residue.kind.is_polymer() && chain_ends {
                self.write_ter_record(serial, residue)?;
                serial += 1;
            }
        }

        self.atom_serials = serials;
        Ok(())
    }

    fn write_atom_record(
        &mut self,
        record: &str,
        serial: usize,
        atom: &Atom,
        pos: &Point,
        residue: &Residue,
    ) -> Result<(), Error> {
        let atom_name = if atom.name.len() >= 4 || atom.element.symbol().len() == 2 {
            format!("{:<4}", truncate(&atom.name, 4))
        } else {
            format!(" {:<3}", atom.name)
        };

        self.line(format_args!(
            "{:6}{:5} {:4} {:>3} {:1}{:4}{:1}   {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}          {:>2}",
            record,
            serial % 100000,
            atom_name,
            truncate(&residue.name, 3),
            residue.chain_id.chars().next().unwrap_or(' '),
            residue.id % 10000,
            residue.insertion_code.unwrap_or(' '),
            pos.x,
            pos.y,
            pos.z,
            1.00,
            0.00,
            atom.element.symbol().to_uppercase()
        ))
    }

    fn write_ter_record(&mut self, serial: usize, residue: &Residue) -> Result<(), Error> {
        self.line(format_args!(
            "TER   {:5}      {:>3} {:1}{:4}{:1}",
            serial % 100000,
            truncate(&residue.name, 3),
            residue.chain_id.chars().next().unwrap_or(' '),
            residue.id % 10000,
            residue.insertion_code.unwrap_or(' ')
        ))
    }

    fn write_connects(&mut self, topology: &Topology) -> Result<(), Error> {
        let mut adjacency: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

        for bond in topology.bonds() {
            let [s1, s2] = [bond.a1_idx, bond.a2_idx].map(|idx| {
                self.atom_serials.get(idx).copied().ok_or_else(|| {
                    Error::inconsistent_data(
                        FORMAT,
                        None,
                        format!("bond references atom index {idx} that was not written"),
                    )
                })
            });
            let (s1, s2) = (s1?, s2?);

            adjacency.entry(s1).or_default().push(s2);
            adjacency.entry(s2).or_default().push(s1);
        }

        for (source, mut targets) in adjacency {
            targets.sort_unstable();
            targets.dedup();

            for chunk in targets.chunks(4) {
                let partners: String = chunk.iter().map(|t| format!("{t:5}")).collect();
                self.line(format_args!("CONECT{source:5}{partners}"))?;
            }
        }

        Ok(())
    }

    fn write_end(&mut self) -> Result<(), Error> {
        self.line(format_args!("END"))
    }
}

fn truncate(text: &str, width: usize) -> &str {
    text.get(..width).unwrap_or(text)
}
