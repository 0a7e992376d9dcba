use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use postgres::{Client, NoTls, Statement};

use crate::measure::Row;
use crate::Result;

/// Destination for measurement rows.
pub trait RowSink {
    fn insert(&mut self, row: &Row) -> Result<()>;
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    #[inline]
    fn insert(&mut self, row: &Row) -> Result<()> {
        (**self).insert(row)
    }
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS air_quality (
    time timestamptz NOT NULL,
    ip text NOT NULL,
    baseline integer NOT NULL,
    eco2 integer NOT NULL,
    tvoc integer NOT NULL,
    current integer NOT NULL,
    voltage integer NOT NULL
)";

const INSERT_ROW: &str =
    "INSERT INTO air_quality (time, ip, baseline, eco2, tvoc, current, voltage) \
     VALUES ($1, $2, $3, $4, $5, $6, $7)";

/// Appends rows to the `air_quality` table of a PostgreSQL database.
pub struct PostgresSink {
    client: Client,
    insert: Statement,
}

impl PostgresSink {
    /// Connects with a libpq style connection string such as
    /// `host=localhost user=sensors dbname=climate`, creating the table if needed.
    pub fn connect(params: &str) -> Result<Self> {
        let mut client = Client::connect(params, NoTls)?;
        client.batch_execute(CREATE_TABLE)?;
        let insert = client.prepare(INSERT_ROW)?;
        log::info!("connected to database");
        Ok(Self { client, insert })
    }
}

/// Baseline, eCO2, TVOC, current and voltage as `integer` column values.
fn numeric_columns(row: &Row) -> [i32; 5] {
    let r = &row.reading;
    [
        i32::from(row.baseline.value()),
        i32::from(r.eco2),
        i32::from(r.tvoc),
        i32::from(r.current),
        i32::from(r.voltage),
    ]
}

impl RowSink for PostgresSink {
    fn insert(&mut self, row: &Row) -> Result<()> {
        let [baseline, eco2, tvoc, current, voltage] = numeric_columns(row);
        self.client.execute(
            &self.insert,
            &[
                &row.time, &row.host, &baseline, &eco2, &tvoc, &current, &voltage,
            ],
        )?;
        Ok(())
    }
}

/// Local address the kernel would use to reach the internet. A connected UDP socket only
/// selects a route, nothing is sent.
pub fn outbound_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
    Ok(socket.local_addr()?.ip())
}
