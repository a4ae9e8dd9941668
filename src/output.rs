//! Diagnostic printing of sequences and distributed blocks.

use crate::comm::CommunicationBackend;
use crate::error::Result;
use crate::partition::BlockSizeTable;
use std::io::Write;

/// Write values on one line, each formatted `{:7.4}` and followed by a space.
pub fn write_sequence<W: Write>(data: &[f64], writer: &mut W) -> Result<()> {
    for value in data {
        write!(writer, "{:7.4} ", value)?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Write `title` on its own line, then the sequence.
pub fn write_titled_sequence<W: Write>(title: &str, data: &[f64], writer: &mut W) -> Result<()> {
    writeln!(writer, "{title}")?;
    write_sequence(data, writer)
}

/// Write each rank's offset and block length, one rank per line.
pub fn write_block_table<W: Write>(table: &BlockSizeTable, writer: &mut W) -> Result<()> {
    writeln!(writer, "Block layout:")?;
    for (rank, (offset, size)) in table.offsets().iter().zip(table.sizes()).enumerate() {
        writeln!(writer, "  rank {rank}: offset {offset}, {size} elements")?;
    }
    Ok(())
}

/// Write a sequence as CSV.
///
/// Format:
/// ```csv
/// Index,Value
/// 0,1.5
/// 1,2.25
/// ```
pub fn write_sequence_csv<W: Write>(data: &[f64], writer: &mut W) -> Result<()> {
    writeln!(writer, "Index,Value")?;
    for (i, value) in data.iter().enumerate() {
        writeln!(writer, "{},{}", i, value)?;
    }
    Ok(())
}

/// Print every rank's block in rank order.
///
/// Collective: every rank of the group must call it. Ranks take turns
/// between barriers, so output from different ranks never interleaves.
pub fn parallel_print<C, W>(comm: &C, title: &str, block: &[f64], writer: &mut W) -> Result<()>
where
    C: CommunicationBackend + ?Sized,
    W: Write,
{
    comm.barrier();
    if comm.rank() == 0 {
        writeln!(writer, "{title}")?;
        writer.flush()?;
    }
    comm.barrier();

    let mut outcome = Ok(());
    for turn in 0..comm.num_ranks() {
        if turn == comm.rank() {
            // Errors are held until every barrier has been passed.
            outcome = write_rank_block(turn, block, writer);
        }
        comm.barrier();
    }
    outcome
}

fn write_rank_block<W: Write>(rank: usize, block: &[f64], writer: &mut W) -> Result<()> {
    write!(writer, "Rank {rank}: ")?;
    write_sequence(block, writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleProcessComm;

    #[test]
    fn sequence_uses_fixed_width() {
        let mut buf = Vec::new();
        write_sequence(&[1.0, 22.5], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), " 1.0000 22.5000 \n");
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut buf = Vec::new();
        write_sequence_csv(&[3.0, 4.5], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Index,Value\n0,3\n1,4.5\n");
    }

    #[test]
    fn titled_sequence_puts_title_first() {
        let mut buf = Vec::new();
        write_titled_sequence("Initial data:", &[3.0, 1.0], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Initial data:\n 3.0000  1.0000 \n");
    }

    #[test]
    fn block_table_lists_offsets_and_sizes() {
        let table = BlockSizeTable::new(7, 3).unwrap();
        let mut buf = Vec::new();
        write_block_table(&table, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            concat!(
                "Block layout:\n",
                "  rank 0: offset 0, 3 elements\n",
                "  rank 1: offset 3, 2 elements\n",
                "  rank 2: offset 5, 2 elements\n",
            )
        );
    }

    #[test]
    fn parallel_print_single_rank() {
        let mut buf = Vec::new();
        parallel_print(&SingleProcessComm, "Data distribution", &[2.0], &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Data distribution\nRank 0:  2.0000 \n"
        );
    }
}
