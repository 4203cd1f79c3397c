//! The five Bengaluru hospitals used by the demo.

use std::io::Cursor;

use anyhow::Result;

use er_hospital::{Hospital, load_hospitals_reader};

const HOSPITALS_CSV: &str = "\
id,name,lat,lon,capacity,occupancy,specialties,trauma_center,emergency_services,current_wait_time\n\
1,Manipal Hospital Whitefield,12.9698,77.7500,200,,cardiology;neurology;trauma,true,true,20\n\
2,Apollo Hospital Bannerghatta,12.9056,77.5936,300,,cardiac surgery;oncology;neurosurgery,true,true,15\n\
3,Fortis Hospital Cunningham Road,12.9926,77.5985,150,,emergency medicine;pediatrics,false,true,30\n\
4,Narayana Health City,12.8539,77.6648,500,,cardiac surgery;neurosurgery;trauma;pediatrics,true,true,10\n\
5,St. Johns Medical College Hospital,12.9279,77.6271,250,,general medicine;surgery;pediatrics,false,true,25\n\
";

pub fn load() -> Result<Vec<Hospital>> {
    Ok(load_hospitals_reader(Cursor::new(HOSPITALS_CSV))?)
}
