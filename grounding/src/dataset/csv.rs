use super::AnnotationStore;
use crate::common::*;

/// Annotations listed in a CSV file.
///
/// The file has the header `image_file,left,top,right,bottom,phrase`, and
/// lines starting with `#` are ignored. Image paths are relative to the image
/// directory.
#[derive(Debug, Clone)]
pub struct CsvAnnotations {
    pub records: Vec<CsvRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct CsvRecord {
    pub image_file: PathBuf,
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    pub phrase: String,
}

impl CsvAnnotations {
    pub fn open(image_dir: impl AsRef<Path>, annotation_file: impl AsRef<Path>) -> Result<Self> {
        let image_dir = image_dir.as_ref();
        let annotation_file = annotation_file.as_ref();

        // parse annotation file
        let records: Vec<CsvRecord> = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .from_path(annotation_file)
            .with_context(|| {
                format!(
                    "unable to open annotation file '{}'",
                    annotation_file.display()
                )
            })?
            .deserialize::<CsvRecord>()
            .try_collect()
            .with_context(|| {
                format!(
                    "unable to parse annotation file '{}'",
                    annotation_file.display()
                )
            })?;

        // check existence of image files
        let records: Vec<_> = records
            .into_iter()
            .map(|record| {
                let image_file = image_dir.join(&record.image_file);
                ensure!(
                    image_file.is_file(),
                    "the image file '{}' does not exist",
                    image_file.display()
                );
                Ok(CsvRecord {
                    image_file,
                    ..record
                })
            })
            .try_collect()?;

        Ok(Self { records })
    }

    fn record(&self, index: usize) -> Result<&CsvRecord> {
        self.records.get(index).ok_or_else(|| {
            format_err!(
                "record index {} is out of range, the dataset has {} records",
                index,
                self.records.len()
            )
        })
    }
}

impl AnnotationStore for CsvAnnotations {
    fn num_records(&self) -> usize {
        self.records.len()
    }

    fn image_path(&self, index: usize) -> Result<&Path> {
        Ok(&self.record(index)?.image_file)
    }

    fn annotation_box(&self, index: usize) -> Result<[i64; 4]> {
        let CsvRecord {
            left,
            top,
            right,
            bottom,
            ..
        } = *self.record(index)?;
        Ok([left, top, right, bottom])
    }

    fn phrase(&self, index: usize) -> Result<&str> {
        Ok(&self.record(index)?.phrase)
    }
}
