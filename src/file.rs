use crate::errors::SessionResult;
use crate::measurement::Endpoint;
use crate::session::{Interrupter, Mode, Session};
use crate::slot::SlotView;

/// An open client handle: a session plus the caller's position in the current record
pub struct SensorFile {
    session: Session,
    pos: usize,
}

impl SensorFile {
    pub fn new(session: Session) -> Self {
        Self { session, pos: 0 }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.session.endpoint()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn interrupter(&self) -> Interrupter {
        self.session.interrupter()
    }

    pub async fn mode(&self) -> Mode {
        self.session.mode().await
    }

    pub async fn set_mode(&self, mode: Mode) -> SessionResult<()> {
        self.session.set_mode(mode).await
    }

    pub async fn control(&self, cmd: u32, arg: u32) -> SessionResult<Mode> {
        self.session.control(cmd, arg).await
    }

    pub fn map_view(&self) -> SlotView {
        self.session.map_view()
    }

    /// Read into `buf` from the current position. The position advances by
    /// the bytes returned and rewinds to 0 once the record is drained.
    pub async fn read(&mut self, buf: &mut [u8], nonblocking: bool) -> SessionResult<usize> {
        let want = buf.len();
        let n = self.session.read(self.pos, want, buf, nonblocking).await?;
        if n < want {
            self.pos = 0;
        } else {
            self.pos += n;
            if self.session.pending().await == 0 {
                self.pos = 0;
            }
        }
        Ok(n)
    }

    /// Read the rest of the current record, or a whole fresh one when
    /// positioned at its start. Blocks until a sample is available.
    pub async fn read_record(&mut self) -> SessionResult<Vec<u8>> {
        let mut record = Vec::new();
        // asking for everything always drains the staged record
        self.session.read(self.pos, usize::MAX, &mut record, false).await?;
        self.pos = 0;
        Ok(record)
    }

    pub fn close(self) {
        self.session.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::registry::DeviceTable;
    use crate::render::RECORD_STRIDE;

    fn table() -> DeviceTable {
        let cfg = SensorConfig::parse("[[sensor]]\nindex = 0\nid = \"a\"\ndriver = \"simulated\"\n")
            .unwrap();
        DeviceTable::from_config(&cfg)
    }

    #[tokio::test]
    async fn test_small_reads_walk_the_record() {
        let t = table();
        let mut f = SensorFile::new(t.open_path("sensor0-batt").unwrap());
        t.slot(f.endpoint()).unwrap().publish(1023);

        let mut record = Vec::new();
        let mut chunk = [0u8; 3];
        loop {
            let n = f.read(&mut chunk, true).await.unwrap();
            record.extend_from_slice(&chunk[..n]);
            if f.position() == 0 {
                break;
            }
        }
        assert_eq!(record, b"3.30      ".to_vec());
        assert_eq!(record.len(), RECORD_STRIDE);
        assert_eq!(f.read(&mut chunk, true).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_exact_read_rewinds() {
        let t = table();
        let mut f = SensorFile::new(t.open_path("sensor0-temp").unwrap());
        f.set_mode(Mode::Raw).await.unwrap();
        let slot = t.slot(f.endpoint()).unwrap();
        slot.publish(300);

        let mut two = [0u8; 2];
        assert_eq!(f.read(&mut two, true).await.unwrap(), 2);
        assert_eq!(two, [0x01, 0x2C]);
        assert_eq!(f.position(), 0);

        slot.publish(301);
        assert_eq!(f.read(&mut two, true).await.unwrap(), 2);
        assert_eq!(two, [0x01, 0x2D]);
    }

    #[tokio::test]
    async fn test_read_record_after_partial_read() {
        let t = table();
        let mut f = SensorFile::new(t.open_path("sensor0-light").unwrap());
        t.slot(f.endpoint()).unwrap().publish(0);

        let mut one = [0u8; 1];
        f.read(&mut one, true).await.unwrap();
        assert_eq!(f.position(), 1);

        // finishes the staged record from where the caller stopped
        let rest = f.read_record().await.unwrap();
        assert_eq!(rest, b".00      ".to_vec());
        assert_eq!(f.position(), 0);
        f.close();
    }
}
