use embedded_storage::{ReadStorage, Storage};
use esp_bootloader_esp_idf::partitions::{
    DataPartitionSubType, PARTITION_TABLE_MAX_LEN, PartitionType, read_partition_table,
};
use esp_rom_sys::rom::spiflash::{
    ESP_ROM_SPIFLASH_RESULT_OK, esp_rom_spiflash_erase_sector, esp_rom_spiflash_read,
    esp_rom_spiflash_unlock, esp_rom_spiflash_write,
};
use log::{info, warn};
use nowdeck_core::credentials::{
    CredentialStore, DEVICE_ID_BYTES, DeviceId, REMOTE_DEVICE_ID_BYTES, RemoteDeviceId,
    StoredCredentials,
};

const FLASH_SECTOR_SIZE: u32 = 4096;
const DEFAULT_FLASH_CAPACITY_BYTES: usize = 16 * 1024 * 1024;

const RECORD_MAGIC: u32 = 0x3143_444E; // "NDC1"
const RECORD_VERSION: u8 = 1;

const FLAG_LOGGED_IN: u8 = 0x01;
const FLAG_HAS_REMOTE: u8 = 0x02;

// magic(4) version(1) flags(1) id_len(1) remote_len(1) id(40) remote(64) crc(4)
const DEVICE_ID_AT: usize = 8;
const REMOTE_ID_AT: usize = DEVICE_ID_AT + DEVICE_ID_BYTES;
const CHECKSUM_AT: usize = REMOTE_ID_AT + REMOTE_DEVICE_ID_BYTES;
const RECORD_LEN: usize = CHECKSUM_AT + 4;

const _: () = assert!(RECORD_LEN % 4 == 0);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FlashCredentialsError {
    PartitionTable,
    PartitionMissing,
    PartitionTooSmall,
    FlashOpFailed(i32),
    Corrupted,
    Unaligned,
}

/// ROM SPI-flash access restricted to whole, aligned words.
#[derive(Debug)]
struct RawFlash;

impl RawFlash {
    fn unlock() -> Result<Self, FlashCredentialsError> {
        check(unsafe { esp_rom_spiflash_unlock() })?;
        Ok(Self)
    }

    fn erase_sector(&mut self, addr: u32) -> Result<(), FlashCredentialsError> {
        if !addr.is_multiple_of(FLASH_SECTOR_SIZE) {
            return Err(FlashCredentialsError::Unaligned);
        }
        check(unsafe { esp_rom_spiflash_erase_sector(addr / FLASH_SECTOR_SIZE) })
    }

    fn read_aligned(&mut self, addr: u32, out: &mut [u8]) -> Result<(), FlashCredentialsError> {
        if !addr.is_multiple_of(4) || !out.len().is_multiple_of(4) {
            return Err(FlashCredentialsError::Unaligned);
        }
        for (index, chunk) in out.chunks_exact_mut(4).enumerate() {
            let mut word = 0u32;
            let at = addr + (index as u32) * 4;
            check(unsafe { esp_rom_spiflash_read(at, &mut word as *mut u32 as *const u32, 4) })?;
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    /// Target range must already be erased.
    fn program_aligned(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashCredentialsError> {
        if !addr.is_multiple_of(4) || !data.len().is_multiple_of(4) {
            return Err(FlashCredentialsError::Unaligned);
        }
        for (index, chunk) in data.chunks_exact(4).enumerate() {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let at = addr + (index as u32) * 4;
            check(unsafe { esp_rom_spiflash_write(at, &word as *const u32, 4) })?;
        }
        Ok(())
    }
}

fn check(rc: i32) -> Result<(), FlashCredentialsError> {
    if rc == ESP_ROM_SPIFLASH_RESULT_OK {
        Ok(())
    } else {
        Err(FlashCredentialsError::FlashOpFailed(rc))
    }
}

impl ReadStorage for RawFlash {
    type Error = FlashCredentialsError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_aligned(offset, bytes)
    }

    fn capacity(&self) -> usize {
        DEFAULT_FLASH_CAPACITY_BYTES
    }
}

impl Storage for RawFlash {
    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err(FlashCredentialsError::Unaligned)
    }
}

/// Credentials record kept in the last sector of a writable data partition.
#[derive(Debug)]
pub struct FlashCredentialStore {
    flash: RawFlash,
    sector_addr: u32,
}

impl FlashCredentialStore {
    pub fn new() -> Result<Self, FlashCredentialsError> {
        let mut flash = RawFlash::unlock()?;

        let mut table_buf = [0u8; PARTITION_TABLE_MAX_LEN];
        let table = read_partition_table(&mut flash, &mut table_buf)
            .map_err(|_| FlashCredentialsError::PartitionTable)?;

        let mut undefined: Option<(u32, u32)> = None;
        let mut nvs: Option<(u32, u32)> = None;
        for entry in table.iter() {
            if entry.is_read_only() || entry.len() < FLASH_SECTOR_SIZE {
                continue;
            }
            match entry.partition_type() {
                PartitionType::Data(DataPartitionSubType::Undefined) if undefined.is_none() => {
                    undefined = Some((entry.offset(), entry.len()));
                }
                PartitionType::Data(DataPartitionSubType::Nvs) if nvs.is_none() => {
                    nvs = Some((entry.offset(), entry.len()));
                }
                _ => {}
            }
        }

        let (offset, len) = undefined
            .or(nvs)
            .ok_or(FlashCredentialsError::PartitionMissing)?;
        if len < FLASH_SECTOR_SIZE {
            return Err(FlashCredentialsError::PartitionTooSmall);
        }

        let sector_addr = offset + len - FLASH_SECTOR_SIZE;
        info!("credentials: flash record at {:#x}", sector_addr);
        Ok(Self { flash, sector_addr })
    }
}

impl CredentialStore for FlashCredentialStore {
    type Error = FlashCredentialsError;

    fn load(&mut self) -> Result<Option<StoredCredentials>, Self::Error> {
        let mut buf = [0u8; RECORD_LEN];
        self.flash.read_aligned(self.sector_addr, &mut buf)?;
        decode_record(&buf)
    }

    fn save(&mut self, credentials: &StoredCredentials) -> Result<(), Self::Error> {
        let buf = encode_record(credentials);
        self.flash.erase_sector(self.sector_addr)?;
        self.flash.program_aligned(self.sector_addr, &buf)
    }

    fn erase(&mut self) -> Result<(), Self::Error> {
        warn!("credentials: erasing flash record");
        self.flash.erase_sector(self.sector_addr)
    }
}

fn encode_record(credentials: &StoredCredentials) -> [u8; RECORD_LEN] {
    let mut buf = [0u8; RECORD_LEN];
    buf[0..4].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
    buf[4] = RECORD_VERSION;

    let mut flags = 0u8;
    if credentials.logged_in {
        flags |= FLAG_LOGGED_IN;
    }

    let device_id = credentials.device_id.as_bytes();
    buf[6] = device_id.len() as u8;
    buf[DEVICE_ID_AT..DEVICE_ID_AT + device_id.len()].copy_from_slice(device_id);

    if let Some(remote) = credentials.last_remote_device.as_ref() {
        flags |= FLAG_HAS_REMOTE;
        let remote = remote.as_bytes();
        buf[7] = remote.len() as u8;
        buf[REMOTE_ID_AT..REMOTE_ID_AT + remote.len()].copy_from_slice(remote);
    }
    buf[5] = flags;

    let checksum = checksum32(&buf[..CHECKSUM_AT]);
    buf[CHECKSUM_AT..].copy_from_slice(&checksum.to_le_bytes());
    buf
}

fn decode_record(buf: &[u8; RECORD_LEN]) -> Result<Option<StoredCredentials>, FlashCredentialsError> {
    if buf.iter().all(|b| *b == 0xFF) {
        return Ok(None);
    }

    let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if magic != RECORD_MAGIC || buf[4] != RECORD_VERSION {
        return Ok(None);
    }

    let expected = u32::from_le_bytes([
        buf[CHECKSUM_AT],
        buf[CHECKSUM_AT + 1],
        buf[CHECKSUM_AT + 2],
        buf[CHECKSUM_AT + 3],
    ]);
    if checksum32(&buf[..CHECKSUM_AT]) != expected {
        return Err(FlashCredentialsError::Corrupted);
    }

    let flags = buf[5];
    let device_id: DeviceId = read_text(&buf[DEVICE_ID_AT..REMOTE_ID_AT], buf[6])?;
    let last_remote_device = if flags & FLAG_HAS_REMOTE != 0 {
        let remote: RemoteDeviceId = read_text(&buf[REMOTE_ID_AT..CHECKSUM_AT], buf[7])?;
        Some(remote)
    } else {
        None
    };

    Ok(Some(StoredCredentials {
        device_id,
        logged_in: flags & FLAG_LOGGED_IN != 0,
        last_remote_device,
    }))
}

fn read_text<const N: usize>(
    field: &[u8],
    len: u8,
) -> Result<heapless::String<N>, FlashCredentialsError> {
    let bytes = field
        .get(..len as usize)
        .ok_or(FlashCredentialsError::Corrupted)?;
    let text = core::str::from_utf8(bytes).map_err(|_| FlashCredentialsError::Corrupted)?;
    heapless::String::try_from(text).map_err(|_| FlashCredentialsError::Corrupted)
}

fn checksum32(bytes: &[u8]) -> u32 {
    let mut hash = 0x811C_9DC5u32;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
